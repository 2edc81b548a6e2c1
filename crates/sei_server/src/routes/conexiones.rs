use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sei_core::model::conexion::{AccionConexion, Conexion, ConexionVista, Sugerencia};
use sei_core::model::RowId;
use serde::Deserialize;
use serde_json::{json, Value};

use super::LimitQuery;
use crate::{auth::CurrentUser, error::AppResult, services, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SolicitarRequest {
    pub destino_id: RowId,
    pub mensaje: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponderRequest {
    pub conexion_id: RowId,
    pub accion: AccionConexion,
}

#[derive(Debug, Deserialize)]
pub struct VerificarQuery {
    pub con: RowId,
}

pub async fn list_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<ConexionVista>>> {
    let rows = state
        .db(move |conn| Ok(services::conexiones(conn)?.listar(user.investigador_id)?))
        .await?;
    Ok(Json(rows))
}

pub async fn solicitar_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SolicitarRequest>,
) -> AppResult<(StatusCode, Json<Conexion>)> {
    let conexion = state
        .db(move |conn| {
            Ok(services::conexiones(conn)?.solicitar(
                user.investigador_id,
                payload.destino_id,
                payload.mensaje.as_deref(),
            )?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(conexion)))
}

pub async fn responder_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ResponderRequest>,
) -> AppResult<Json<Conexion>> {
    let conexion = state
        .db(move |conn| {
            Ok(services::conexiones(conn)?.responder(
                payload.conexion_id,
                user.investigador_id,
                payload.accion,
            )?)
        })
        .await?;
    Ok(Json(conexion))
}

pub async fn pendientes_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let pendientes = state
        .db(move |conn| Ok(services::conexiones(conn)?.pendientes(user.investigador_id)?))
        .await?;
    Ok(Json(json!({ "pendientes": pendientes })))
}

/// Connection state between the caller and `con`, in either direction.
pub async fn verificar_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<VerificarQuery>,
) -> AppResult<Json<Value>> {
    let conexion = state
        .db(move |conn| {
            Ok(services::conexiones(conn)?.estado_con(user.investigador_id, params.con)?)
        })
        .await?;
    Ok(Json(json!({
        "conectados": conexion.is_some(),
        "estado": conexion.as_ref().map(|c| c.estado),
        "conexion": conexion,
    })))
}

/// Related researchers the caller is not connected with yet.
pub async fn sugerencias_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<Sugerencia>>> {
    let sugerencias = state
        .db(move |conn| {
            Ok(services::conexiones(conn)?.sugerencias(user.investigador_id, params.limit)?)
        })
        .await?;
    Ok(Json(sugerencias))
}
