use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use sei_core::model::institucion::{Institucion, InstitucionConConteo, InstitucionInput};
use sei_core::repo::institucion_repo::{InstitucionRepository, SqliteInstitucionRepository};

use super::{parse_id, read_file_field, uploads::ensure_image};
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub async fn list_handler(State(state): State<AppState>) -> AppResult<Json<Vec<InstitucionConConteo>>> {
    let rows = state
        .db(|conn| Ok(SqliteInstitucionRepository::try_new(conn)?.list()?))
        .await?;
    Ok(Json(rows))
}

pub async fn create_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(mut input): Json<InstitucionInput>,
) -> AppResult<(StatusCode, Json<InstitucionConConteo>)> {
    input.normalize();
    let institucion = state
        .db(move |conn| {
            let repo = SqliteInstitucionRepository::try_new(conn)?;
            let id = repo.create(&input)?;
            load(&repo, id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(institucion)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<InstitucionConConteo>> {
    let id = parse_id(&id)?;
    let institucion = state
        .db(move |conn| load(&SqliteInstitucionRepository::try_new(conn)?, id))
        .await?;
    Ok(Json(institucion))
}

pub async fn update_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(mut input): Json<InstitucionInput>,
) -> AppResult<Json<Institucion>> {
    let id = parse_id(&id)?;
    input.normalize();
    let institucion = state
        .db(move |conn| Ok(SqliteInstitucionRepository::try_new(conn)?.update(id, &input)?))
        .await?;
    Ok(Json(institucion))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state
        .db(move |conn| Ok(SqliteInstitucionRepository::try_new(conn)?.delete(id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stores an institution logo and links it to the row.
pub async fn imagen_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<InstitucionConConteo>> {
    let id = parse_id(&id)?;
    let file = read_file_field(&mut multipart, &["imagen", "file"]).await?;
    ensure_image(file.content_type.as_deref(), file.bytes.len())?;

    let exists = state
        .db(move |conn| Ok(SqliteInstitucionRepository::try_new(conn)?.get(id)?.is_some()))
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("institucion not found: {id}")));
    }

    let blobs = state.blobs.clone();
    let stored =
        tokio::task::spawn_blocking(move || blobs.put("instituciones", &file.filename, &file.bytes))
            .await??;

    let url = stored.url;
    let institucion = state
        .db(move |conn| {
            let repo = SqliteInstitucionRepository::try_new(conn)?;
            repo.set_imagen_url(id, &url)?;
            load(&repo, id)
        })
        .await?;
    Ok(Json(institucion))
}

fn load(repo: &SqliteInstitucionRepository<'_>, id: i64) -> AppResult<InstitucionConConteo> {
    repo.get(id)?
        .ok_or_else(|| AppError::NotFound(format!("institucion not found: {id}")))
}
