//! Statistics and administrator routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use sei_core::now_epoch_ms;
use sei_core::service::estadisticas_service::{
    Estadisticas, EstadisticasService, UsuariosActivos, DEFAULT_VENTANA_MINUTOS,
};
use sei_core::Investigador;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{hoy, parse_id};
use crate::{
    auth::{AdminUser, CurrentUser},
    error::{AppError, AppResult},
    services,
    state::AppState,
};

const MAX_VENTANA_MINUTOS: u32 = 24 * 60;

#[derive(Debug, Default, Deserialize)]
pub struct VentanaQuery {
    pub minutos: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RolesRequest {
    pub es_admin: bool,
    pub es_evaluador: bool,
}

pub async fn estadisticas_handler(State(state): State<AppState>) -> AppResult<Json<Estadisticas>> {
    let hoy = hoy();
    let totales = state
        .db(move |conn| Ok(EstadisticasService::try_new(conn)?.totales(hoy)?))
        .await?;
    Ok(Json(totales))
}

pub async fn usuarios_stats_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(params): Query<VentanaQuery>,
) -> AppResult<Json<UsuariosActivos>> {
    let ventana = params
        .minutos
        .filter(|minutos| *minutos > 0)
        .unwrap_or(DEFAULT_VENTANA_MINUTOS)
        .min(MAX_VENTANA_MINUTOS);
    let now = now_epoch_ms();
    let activos = state
        .db(move |conn| Ok(EstadisticasService::try_new(conn)?.usuarios_activos(ventana, now)?))
        .await?;
    Ok(Json(activos))
}

pub async fn evaluadores_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<Investigador>>> {
    let rows = state
        .db(|conn| Ok(services::investigadores(conn)?.evaluadores()?))
        .await?;
    Ok(Json(rows))
}

pub async fn roles_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<RolesRequest>,
) -> AppResult<Json<Investigador>> {
    let id = parse_id(&id)?;
    if id == admin.investigador_id && !payload.es_admin {
        return Err(AppError::BadRequest(
            "administrators cannot remove their own admin role".to_string(),
        ));
    }
    let investigador = state
        .db(move |conn| {
            Ok(services::investigadores(conn)?.asignar_roles(
                id,
                payload.es_admin,
                payload.es_evaluador,
            )?)
        })
        .await?;
    Ok(Json(investigador))
}

/// Reports the caller's roles so the UI can gate admin screens.
pub async fn verificar_acceso_handler(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({
        "autenticado": true,
        "investigador_id": user.investigador_id,
        "es_admin": user.es_admin,
        "es_evaluador": user.es_evaluador,
    }))
}
