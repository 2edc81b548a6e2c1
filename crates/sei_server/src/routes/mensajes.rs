use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sei_core::model::mensaje::{Mensaje, MensajeVista, NuevoMensaje};
use serde_json::{json, Value};

use super::parse_id;
use crate::{auth::CurrentUser, error::AppResult, services, state::AppState};

pub async fn list_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<MensajeVista>>> {
    let rows = state
        .db(move |conn| Ok(services::mensajes(conn)?.listar(user.investigador_id)?))
        .await?;
    Ok(Json(rows))
}

pub async fn enviar_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<NuevoMensaje>,
) -> AppResult<(StatusCode, Json<Mensaje>)> {
    let mensaje = state
        .db(move |conn| Ok(services::mensajes(conn)?.enviar(user.investigador_id, payload)?))
        .await?;
    Ok((StatusCode::CREATED, Json(mensaje)))
}

pub async fn no_leidos_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let no_leidos = state
        .db(move |conn| Ok(services::mensajes(conn)?.no_leidos(user.investigador_id)?))
        .await?;
    Ok(Json(json!({ "no_leidos": no_leidos })))
}

pub async fn leido_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    state
        .db(move |conn| Ok(services::mensajes(conn)?.marcar_leido(id, user.investigador_id)?))
        .await?;
    Ok(Json(json!({ "success": true })))
}
