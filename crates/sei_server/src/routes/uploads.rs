//! Profile file uploads (CV and photograph).

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use sei_core::extract::validate_upload;
use sei_core::repo::investigador_repo::ArchivoPerfil;
use sei_core::Investigador;
use serde::Serialize;

use super::{read_file_field, UploadedFile};
use crate::{
    auth::CurrentUser,
    error::{AppError, AppResult},
    services,
    state::AppState,
};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub investigador: Investigador,
}

pub fn ensure_image(content_type: Option<&str>, size: usize) -> AppResult<()> {
    if size == 0 {
        return Err(AppError::BadRequest("no file was uploaded".to_string()));
    }
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if !IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "only JPEG, PNG or WebP images are accepted, got `{content_type}`"
        )));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "image of {size} bytes exceeds the {MAX_IMAGE_BYTES} byte limit"
        )));
    }
    Ok(())
}

pub async fn upload_cv_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let file = read_file_field(&mut multipart, &["file", "cv"]).await?;
    validate_upload(file.content_type.as_deref(), file.bytes.len())?;
    store_and_link(&state, user.investigador_id, ArchivoPerfil::Cv, "cvs", file).await
}

pub async fn upload_fotografia_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let file = read_file_field(&mut multipart, &["file", "fotografia"]).await?;
    ensure_image(file.content_type.as_deref(), file.bytes.len())?;
    store_and_link(
        &state,
        user.investigador_id,
        ArchivoPerfil::Fotografia,
        "fotografias",
        file,
    )
    .await
}

async fn store_and_link(
    state: &AppState,
    investigador_id: i64,
    archivo: ArchivoPerfil,
    folder: &'static str,
    file: UploadedFile,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let blobs = state.blobs.clone();
    let size = file.bytes.len();
    let stored = tokio::task::spawn_blocking(move || blobs.put(folder, &file.filename, &file.bytes))
        .await??;

    let url = stored.url.clone();
    let investigador = state
        .db(move |conn| {
            Ok(services::investigadores(conn)?.vincular_archivo(investigador_id, archivo, &url)?)
        })
        .await?;

    log::info!(
        "event=upload module=server status=ok investigador_id={investigador_id} folder={folder} bytes={size}"
    );
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            url: stored.url,
            investigador,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::{ensure_image, MAX_IMAGE_BYTES};

    #[test]
    fn accepts_common_photo_formats() {
        assert!(ensure_image(Some("image/jpeg"), 10).is_ok());
        assert!(ensure_image(Some("IMAGE/PNG"), 10).is_ok());
    }

    #[test]
    fn rejects_other_types_empty_or_oversized_files() {
        assert!(ensure_image(Some("application/pdf"), 10).is_err());
        assert!(ensure_image(None, 10).is_err());
        assert!(ensure_image(Some("image/png"), 0).is_err());
        assert!(ensure_image(Some("image/png"), MAX_IMAGE_BYTES + 1).is_err());
    }
}
