use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sei_core::model::convocatoria::{Convocatoria, ConvocatoriaInput, ConvocatoriaVista};
use sei_core::repo::convocatoria_repo::{ConvocatoriaRepository, SqliteConvocatoriaRepository};

use super::{hoy, parse_id};
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    state::AppState,
};

/// Calls ordered by closing date, each with its status for today.
pub async fn list_handler(State(state): State<AppState>) -> AppResult<Json<Vec<ConvocatoriaVista>>> {
    let hoy = hoy();
    let rows = state
        .db(|conn| Ok(SqliteConvocatoriaRepository::try_new(conn)?.list()?))
        .await?;
    Ok(Json(rows.into_iter().map(|row| row.vista(hoy)).collect()))
}

pub async fn create_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(mut input): Json<ConvocatoriaInput>,
) -> AppResult<(StatusCode, Json<ConvocatoriaVista>)> {
    input.normalize();
    let hoy = hoy();
    let vista = state
        .db(move |conn| {
            let repo = SqliteConvocatoriaRepository::try_new(conn)?;
            let id = repo.create(&input)?;
            Ok(load(&repo, id)?.vista(hoy))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(vista)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ConvocatoriaVista>> {
    let id = parse_id(&id)?;
    let hoy = hoy();
    let vista = state
        .db(move |conn| Ok(load(&SqliteConvocatoriaRepository::try_new(conn)?, id)?.vista(hoy)))
        .await?;
    Ok(Json(vista))
}

pub async fn update_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(mut input): Json<ConvocatoriaInput>,
) -> AppResult<Json<ConvocatoriaVista>> {
    let id = parse_id(&id)?;
    input.normalize();
    let hoy = hoy();
    let vista = state
        .db(move |conn| {
            Ok(SqliteConvocatoriaRepository::try_new(conn)?
                .update(id, &input)?
                .vista(hoy))
        })
        .await?;
    Ok(Json(vista))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state
        .db(move |conn| Ok(SqliteConvocatoriaRepository::try_new(conn)?.delete(id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn load(repo: &SqliteConvocatoriaRepository<'_>, id: i64) -> AppResult<Convocatoria> {
    repo.get(id)?
        .ok_or_else(|| AppError::NotFound(format!("convocatoria not found: {id}")))
}
