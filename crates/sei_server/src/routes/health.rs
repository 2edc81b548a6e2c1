use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppResult, state::AppState};

pub async fn banner_handler() -> Json<Value> {
    Json(json!({
        "service": "sei",
        "name": "Sistema Estatal de Investigadores",
        "version": sei_core::core_version(),
    }))
}

/// Liveness plus a trivial query against the database.
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let schema_version: i64 = state
        .db(|conn| {
            Ok(conn
                .query_row("PRAGMA user_version;", [], |row| row.get(0))
                .map_err(sei_core::repo::RepoError::from)?)
        })
        .await?;

    Ok(Json(json!({
        "status": "ok",
        "ping": sei_core::ping(),
        "schema_version": schema_version,
    })))
}
