//! HTTP handlers grouped by resource.
//!
//! Handlers authenticate through extractors, run one unit of database work
//! on the blocking pool and return JSON.

use axum::{body::Bytes, extract::Multipart};
use chrono::NaiveDate;
use sei_core::model::RowId;
use sei_core::SessionUser;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub mod admin;
pub mod auth;
pub mod campos;
pub mod conexiones;
pub mod convocatorias;
pub mod cron;
pub mod health;
pub mod instituciones;
pub mod investigadores;
pub mod mensajes;
pub mod ocr;
pub mod proyectos;
pub mod publicaciones;
pub mod registro;
pub mod search;
pub mod uploads;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

/// One file part of a multipart body.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Reads the first part named in `names`, skipping every other part.
pub async fn read_file_field(multipart: &mut Multipart, names: &[&str]) -> AppResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("invalid multipart body: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if !names.contains(&name.as_str()) {
            continue;
        }
        let filename = field.file_name().unwrap_or("archivo").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(format!("cannot read `{name}`: {err}")))?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }
    Err(AppError::BadRequest(format!(
        "multipart field `{}` is required",
        names.first().copied().unwrap_or("file")
    )))
}

/// Local calendar date used for convocatoria status.
pub fn hoy() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_id(raw: &str) -> AppResult<RowId> {
    raw.trim()
        .parse::<RowId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("invalid id `{raw}`")))
}

/// Admins edit any row; others only rows they created.
pub fn ensure_can_edit(user: &SessionUser, creado_por: Option<RowId>, entity: &str) -> AppResult<()> {
    if creado_por.map_or(user.es_admin, |creador| user.can_manage(creador)) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "only the {entity} creator or an administrator may change it"
    )))
}

#[cfg(test)]
mod tests {
    use super::{ensure_can_edit, parse_id};
    use sei_core::SessionUser;

    fn user(id: i64, es_admin: bool) -> SessionUser {
        SessionUser {
            investigador_id: id,
            slug: None,
            nombre_completo: "Ana Ruiz".to_string(),
            correo: None,
            es_admin,
            es_evaluador: false,
        }
    }

    #[test]
    fn parse_id_accepts_positive_integers_only() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
        assert!(parse_id("ana-ruiz-3").is_err());
    }

    #[test]
    fn only_creator_or_admin_may_edit() {
        assert!(ensure_can_edit(&user(7, false), Some(7), "proyecto").is_ok());
        assert!(ensure_can_edit(&user(8, false), Some(7), "proyecto").is_err());
        assert!(ensure_can_edit(&user(8, true), Some(7), "proyecto").is_ok());
        assert!(ensure_can_edit(&user(8, false), None, "proyecto").is_err());
        assert!(ensure_can_edit(&user(8, true), None, "proyecto").is_ok());
    }
}
