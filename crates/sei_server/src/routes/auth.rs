use axum::{extract::State, Json};
use sei_core::{now_epoch_ms, SessionToken, SessionUser};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{BearerToken, CurrentUser},
    error::AppResult,
    services,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub correo: String,
    pub password: String,
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<SessionToken>> {
    let ttl = state.config.session_ttl;
    let token = state
        .db(move |conn| {
            Ok(services::auth(conn, ttl)?.login(
                &payload.correo,
                &payload.password,
                now_epoch_ms(),
            )?)
        })
        .await?;
    Ok(Json(token))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    BearerToken(token): BearerToken,
) -> AppResult<Json<Value>> {
    let ttl = state.config.session_ttl;
    let revoked = state
        .db(move |conn| Ok(services::auth(conn, ttl)?.logout(&token)?))
        .await?;
    Ok(Json(json!({ "success": revoked })))
}

pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<SessionUser> {
    Json(user)
}
