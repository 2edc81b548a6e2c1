use axum::{extract::State, http::StatusCode, Json};
use sei_core::now_epoch_ms;
use sei_core::repo::registro_repo::NuevoRegistro;
use sei_core::service::registro_service::SolicitudRegistrada;
use sei_core::Investigador;
use serde::Deserialize;

use crate::{error::AppResult, services, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CompletarRequest {
    pub codigo: String,
    pub password: String,
}

pub async fn solicitar_handler(
    State(state): State<AppState>,
    Json(payload): Json<NuevoRegistro>,
) -> AppResult<(StatusCode, Json<SolicitudRegistrada>)> {
    let notifier = state.notifier.clone();
    let solicitud = state
        .db(move |conn| Ok(services::registro(conn, notifier)?.solicitar(payload, now_epoch_ms())?))
        .await?;
    Ok((StatusCode::CREATED, Json(solicitud)))
}

pub async fn completar_handler(
    State(state): State<AppState>,
    Json(payload): Json<CompletarRequest>,
) -> AppResult<(StatusCode, Json<Investigador>)> {
    let notifier = state.notifier.clone();
    let investigador = state
        .db(move |conn| {
            Ok(services::registro(conn, notifier)?.completar(
                &payload.codigo,
                &payload.password,
                now_epoch_ms(),
            )?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(investigador)))
}
