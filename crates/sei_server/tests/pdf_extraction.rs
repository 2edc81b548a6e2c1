#![cfg(unix)]

mod common;

use axum::http::StatusCode;
use common::{multipart_request, send, spawn_app_with_extractor};

const CV_SCRIPT: &str = "cat <<'CV'
CURRICULUM VITAE
Nombre: Ana Ruiz Soto
CURP: RUSA850101MCHZTN09
Correo: ana.ruiz@uach.mx
Telefono: 614 123 4567
CV";

const NO_ID_SCRIPT: &str = "cat <<'CV'
Nombre: Luis Perez Lara
Correo: luis.perez@uach.mx
Semblanza sin identificadores oficiales.
CV";

fn pdf_upload(uri: &str) -> axum::http::Request<axum::body::Body> {
    multipart_request(uri, None, "file", "cv.pdf", "application/pdf", b"%PDF-1.4 cv")
}

#[tokio::test]
async fn ocr_stores_a_profile_once() {
    let app = spawn_app_with_extractor(CV_SCRIPT, |_| {});

    let (status, body) = send(&app.router, pdf_upload("/api/ocr")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["investigador"]["origen"], "ocr");
    assert_eq!(body["investigador"]["curp"], "RUSA850101MCHZTN09");
    let campos: Vec<&str> = body["campos_encontrados"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|campo| campo.as_str())
        .collect();
    for campo in ["curp", "correo", "telefono", "nombre_completo"] {
        assert!(campos.contains(&campo), "missing {campo} in {campos:?}");
    }

    let (status, body) = send(&app.router, pdf_upload("/api/ocr")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "curp is already registered");
}

#[tokio::test]
async fn ocr_refuses_documents_without_a_key_identifier() {
    let app = spawn_app_with_extractor(NO_ID_SCRIPT, |_| {});

    let (status, body) = send(&app.router, pdf_upload("/api/ocr")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no CURP"));
}

#[tokio::test]
async fn process_pdf_returns_fields_without_persisting() {
    let app = spawn_app_with_extractor(CV_SCRIPT, |_| {});

    let (status, body) = send(&app.router, pdf_upload("/process-pdf")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["curp"], "RUSA850101MCHZTN09");
    assert_eq!(body["metadata"]["filename"], "cv.pdf");
    assert_eq!(body["metadata"]["pages"], 1);
    assert!(body["metadata"]["text_length"].as_u64().unwrap() > 0);

    // Nothing was stored, so the same CV is still new to /api/ocr.
    let (status, _) = send(&app.router, pdf_upload("/api/ocr")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn failing_extractor_is_a_bad_gateway() {
    let app = spawn_app_with_extractor("echo 'Syntax Error: damaged' >&2\nexit 3", |_| {});

    let (status, body) = send(&app.router, pdf_upload("/process-pdf")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}
