use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sei_core::model::publicacion::{Publicacion, PublicacionInput};
use sei_core::repo::publicacion_repo::{
    PublicacionListQuery, PublicacionRepository, SqlitePublicacionRepository,
};
use serde::Deserialize;

use super::{ensure_can_edit, parse_id};
use crate::{
    auth::CurrentUser,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub autor: Option<String>,
    pub categoria: Option<String>,
    pub anio: Option<i32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<Publicacion>>> {
    let query = PublicacionListQuery {
        autor: params.autor,
        categoria: params.categoria,
        anio: params.anio,
        limit: params.limit,
        offset: params.offset,
    };
    let rows = state
        .db(move |conn| Ok(SqlitePublicacionRepository::try_new(conn)?.list(&query)?))
        .await?;
    Ok(Json(rows))
}

/// Distinct journal and publisher names for form suggestions.
pub async fn revistas_handler(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let rows = state
        .db(|conn| Ok(SqlitePublicacionRepository::try_new(conn)?.revistas()?))
        .await?;
    Ok(Json(rows))
}

pub async fn create_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut input): Json<PublicacionInput>,
) -> AppResult<(StatusCode, Json<Publicacion>)> {
    input.normalize();
    let publicacion = state
        .db(move |conn| {
            let repo = SqlitePublicacionRepository::try_new(conn)?;
            let id = repo.create(&input, Some(user.investigador_id))?;
            load(&repo, id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(publicacion)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Publicacion>> {
    let id = parse_id(&id)?;
    let publicacion = state
        .db(move |conn| load(&SqlitePublicacionRepository::try_new(conn)?, id))
        .await?;
    Ok(Json(publicacion))
}

pub async fn update_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(mut input): Json<PublicacionInput>,
) -> AppResult<Json<Publicacion>> {
    let id = parse_id(&id)?;
    input.normalize();
    let publicacion = state
        .db(move |conn| {
            let repo = SqlitePublicacionRepository::try_new(conn)?;
            let actual = load(&repo, id)?;
            ensure_can_edit(&user, actual.creado_por, "publicacion")?;
            Ok(repo.update(id, &input)?)
        })
        .await?;
    Ok(Json(publicacion))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state
        .db(move |conn| {
            let repo = SqlitePublicacionRepository::try_new(conn)?;
            let actual = load(&repo, id)?;
            ensure_can_edit(&user, actual.creado_por, "publicacion")?;
            Ok(repo.delete(id)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn load(repo: &SqlitePublicacionRepository<'_>, id: i64) -> AppResult<Publicacion> {
    repo.get(id)?
        .ok_or_else(|| AppError::NotFound(format!("publicacion not found: {id}")))
}
