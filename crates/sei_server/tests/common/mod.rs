#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rusqlite::Connection;
use sei_core::model::investigador::{NuevoInvestigador, Origen};
use sei_core::repo::credencial_repo::SqliteCredencialRepository;
use sei_core::repo::investigador_repo::SqliteInvestigadorRepository;
use sei_core::repo::sesion_repo::SqliteSesionRepository;
use sei_core::service::investigador_service::InvestigadorService;
use sei_core::AuthService;
use sei_server::{build_router, config::Config, state::AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "chihuahua-2024";
pub const BOUNDARY: &str = "sei-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        upload_dir: dir.path().join("uploads"),
        db_path: dir.path().join("unused.sqlite3"),
        pdftotext_bin: dir
            .path()
            .join("missing-pdftotext")
            .to_string_lossy()
            .into_owned(),
        ..Config::from_lookup(|_| None)
    }
}

/// Builds a router over an in-memory database prepared by `seed`.
pub fn spawn_app(seed: impl FnOnce(&Connection)) -> TestApp {
    spawn_app_with(|_, state| state, seed)
}

pub fn spawn_app_with(
    customize: impl FnOnce(&TempDir, AppState) -> AppState,
    seed: impl FnOnce(&Connection),
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let conn = sei_core::open_db_in_memory().unwrap();
    seed(&conn);
    let state = customize(&dir, AppState::new(test_config(&dir), conn));
    TestApp {
        router: build_router(state),
        dir,
    }
}

/// Builds a router whose text extractor is a shell script printing `script`.
#[cfg(unix)]
pub fn spawn_app_with_extractor(script: &str, seed: impl FnOnce(&Connection)) -> TestApp {
    spawn_app_with(
        |dir, mut state| {
            let bin = stub_extractor(dir, script);
            state.config = std::sync::Arc::new(Config {
                pdftotext_bin: bin,
                ..(*state.config).clone()
            });
            state
        },
        seed,
    )
}

/// Writes an executable `sh` script into `dir` and returns its path.
#[cfg(unix)]
pub fn stub_extractor(dir: &TempDir, script: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("fake-pdftotext.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// Creates an active researcher with a password; returns its id.
pub fn seed_user(conn: &Connection, nombre: &str, correo: &str, es_admin: bool) -> i64 {
    let service = InvestigadorService::new(SqliteInvestigadorRepository::try_new(conn).unwrap());
    let investigador = service
        .registrar(NuevoInvestigador {
            nombre_completo: nombre.to_string(),
            correo: Some(correo.to_string()),
            institucion: Some("Universidad Autónoma de Chihuahua".to_string()),
            origen: Origen::Admin,
            ..NuevoInvestigador::default()
        })
        .unwrap();
    if es_admin {
        service
            .asignar_roles(investigador.id, true, false)
            .unwrap();
    }
    let auth = AuthService::new(
        SqliteInvestigadorRepository::try_new(conn).unwrap(),
        SqliteCredencialRepository::try_new(conn).unwrap(),
        SqliteSesionRepository::try_new(conn).unwrap(),
    );
    auth.set_password(investigador.id, PASSWORD).unwrap();
    investigador.id
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn multipart_request(
    uri: &str,
    token: Option<&str>,
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn login(router: &Router, correo: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "correo": correo, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}
