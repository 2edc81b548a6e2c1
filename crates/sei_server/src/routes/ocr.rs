//! PDF identification-field extraction.
//!
//! # Responsibility
//! - `/process-pdf` extracts and returns fields without persisting.
//! - `/api/ocr` extracts and stores a new profile with origin `ocr`.
//!
//! # Invariants
//! - A document without CURP, RFC or CVU is never persisted.
//! - Extractor failures surface as 502; bad uploads as 400.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use log::info;
use sei_core::extract::{ensure_sufficient_text, validate_upload, DEFAULT_EXTRACT_TIMEOUT};
use sei_core::{extract_fields, extract_pdf_text, ExtractedFields, Investigador, ServiceError};
use serde::Serialize;

use super::read_file_field;
use crate::{
    error::{AppError, AppResult},
    services,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub filename: String,
    pub pages: usize,
    pub text_length: usize,
}

#[derive(Debug, Serialize)]
pub struct ProcessPdfResponse {
    pub success: bool,
    pub data: ExtractedFields,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub success: bool,
    pub campos_encontrados: Vec<&'static str>,
    pub investigador: Investigador,
}

pub async fn process_pdf_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ProcessPdfResponse>> {
    let (data, metadata) = extract_upload(&state, &mut multipart).await?;
    Ok(Json(ProcessPdfResponse {
        success: true,
        data,
        metadata,
    }))
}

pub async fn ocr_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<OcrResponse>)> {
    let (fields, metadata) = extract_upload(&state, &mut multipart).await?;
    if !fields.has_key_identifier() {
        return Err(AppError::BadRequest(
            "no CURP, RFC or CVU was found in the document".to_string(),
        ));
    }

    let campos_encontrados = fields.found_fields();
    let investigador = state
        .db(move |conn| {
            services::investigadores(conn)?
                .guardar_desde_ocr(&fields)
                .map_err(|err| match err {
                    ServiceError::Duplicate { .. } => AppError::BadRequest(err.to_string()),
                    other => other.into(),
                })
        })
        .await?;

    info!(
        "event=ocr_store module=server status=ok id={} filename={:?}",
        investigador.id, metadata.filename
    );
    Ok((
        StatusCode::CREATED,
        Json(OcrResponse {
            success: true,
            campos_encontrados,
            investigador,
        }),
    ))
}

async fn extract_upload(
    state: &AppState,
    multipart: &mut Multipart,
) -> AppResult<(ExtractedFields, Metadata)> {
    let file = read_file_field(multipart, &["file", "pdf"]).await?;
    validate_upload(file.content_type.as_deref(), file.bytes.len())?;

    let bin = state.config.pdftotext_bin.clone();
    let bytes = file.bytes;
    let pdf = tokio::task::spawn_blocking(move || {
        extract_pdf_text(&bytes, &bin, DEFAULT_EXTRACT_TIMEOUT)
    })
    .await??;
    ensure_sufficient_text(&pdf.text)?;

    let fields = extract_fields(&pdf.text);
    info!(
        "event=pdf_extract module=server status=ok pages={} text_length={} found={}",
        pdf.pages,
        pdf.text.chars().count(),
        fields.found_fields().join(",")
    );
    Ok((
        fields,
        Metadata {
            filename: file.filename,
            pages: pdf.pages,
            text_length: pdf.text.chars().count(),
        },
    ))
}
