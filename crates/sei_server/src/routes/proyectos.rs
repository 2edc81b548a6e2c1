use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sei_core::model::proyecto::{Proyecto, ProyectoInput};
use sei_core::repo::proyecto_repo::{ProyectoListQuery, ProyectoRepository, SqliteProyectoRepository};
use serde::Deserialize;

use super::{ensure_can_edit, LimitQuery};
use crate::{
    auth::CurrentUser,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub categoria: Option<String>,
    pub institucion: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<Proyecto>>> {
    let query = ProyectoListQuery {
        categoria: params.categoria,
        institucion: params.institucion,
        limit: params.limit,
        offset: params.offset,
    };
    let rows = state
        .db(move |conn| Ok(SqliteProyectoRepository::try_new(conn)?.list(&query)?))
        .await?;
    Ok(Json(rows))
}

pub async fn recent_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<Proyecto>>> {
    let rows = state
        .db(move |conn| Ok(SqliteProyectoRepository::try_new(conn)?.recent(params.limit)?))
        .await?;
    Ok(Json(rows))
}

pub async fn create_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut input): Json<ProyectoInput>,
) -> AppResult<(StatusCode, Json<Proyecto>)> {
    input.normalize();
    let creador = user.investigador_id;
    let proyecto = state
        .db(move |conn| {
            let repo = SqliteProyectoRepository::try_new(conn)?;
            let id = repo.create(&input, Some(creador))?;
            repo.get(id)?
                .ok_or_else(|| AppError::NotFound(format!("proyecto not found: {id}")))
        })
        .await?;
    log::info!(
        "event=proyecto_create module=server status=ok id={} creado_por={creador}",
        proyecto.id
    );
    Ok((StatusCode::CREATED, Json(proyecto)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Proyecto>> {
    let proyecto = state
        .db(move |conn| load(&SqliteProyectoRepository::try_new(conn)?, &slug))
        .await?;
    Ok(Json(proyecto))
}

pub async fn update_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(mut input): Json<ProyectoInput>,
) -> AppResult<Json<Proyecto>> {
    input.normalize();
    let proyecto = state
        .db(move |conn| {
            let repo = SqliteProyectoRepository::try_new(conn)?;
            let actual = load(&repo, &slug)?;
            ensure_can_edit(&user, actual.creado_por, "proyecto")?;
            Ok(repo.update(actual.id, &input)?)
        })
        .await?;
    Ok(Json(proyecto))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    state
        .db(move |conn| {
            let repo = SqliteProyectoRepository::try_new(conn)?;
            let actual = load(&repo, &slug)?;
            ensure_can_edit(&user, actual.creado_por, "proyecto")?;
            Ok(repo.delete(actual.id)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn load(repo: &SqliteProyectoRepository<'_>, slug: &str) -> AppResult<Proyecto> {
    repo.get_by_slug(slug.trim())?
        .ok_or_else(|| AppError::NotFound(format!("proyecto not found: {slug}")))
}
