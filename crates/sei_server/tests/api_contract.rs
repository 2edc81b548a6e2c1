mod common;

use axum::http::StatusCode;
use common::{
    get_request, json_request, login, multipart_request, seed_user, send, spawn_app, PASSWORD,
};
use serde_json::json;

#[tokio::test]
async fn health_and_banner_respond() {
    let app = spawn_app(|_| {});

    let (status, body) = send(&app.router, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ping"], "pong");

    let (status, body) = send(&app.router, get_request("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "sei");
}

#[tokio::test]
async fn login_returns_token_and_session_user() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
    });

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "correo": "ANA.RUIZ@uach.mx", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert!(body["expires_at"].as_i64().unwrap() > 0);
    assert_eq!(body["usuario"]["correo"], "ana.ruiz@uach.mx");
    assert_eq!(body["usuario"]["es_admin"], false);

    let (status, me) = send(&app.router, get_request("/api/auth/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["nombre_completo"], "Ana Ruiz Soto");
}

#[tokio::test]
async fn login_rejects_bad_password_with_json_error() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
    });

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "correo": "ana.ruiz@uach.mx", "password": "incorrecta" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app(|_| {});

    let (status, body) = send(&app.router, get_request("/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app.router, get_request("/api/auth/me", Some("deadbeef"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
    });
    let token = login(&app.router, "ana.ruiz@uach.mx").await;

    let (status, body) = send(
        &app.router,
        json_request("POST", "/api/auth/logout", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app.router, get_request("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn project_creation_contract() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
    });
    let proyecto = json!({
        "titulo": "Calidad del Agua en el Río Conchos",
        "descripcion": "Monitoreo de metales pesados.",
        "resumen": "Muestreo trimestral en doce estaciones.",
        "categoria": "Ciencias Ambientales",
        "autor": "Ana Ruiz Soto",
        "institucion": "Universidad Autónoma de Chihuahua",
        "fechaInicio": "2024-02-01",
    });

    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/proyectos", None, proyecto.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app.router, "ana.ruiz@uach.mx").await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/proyectos",
            Some(&token),
            json!({ "titulo": "Solo título" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("descripcion"));

    let (status, created) = send(
        &app.router,
        json_request("POST", "/api/proyectos", Some(&token), proyecto),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let slug = created["slug"].as_str().unwrap();
    assert!(slug.starts_with("calidad-del-agua-en-el-rio-conchos-"));
    assert!(created["creado_por"].as_i64().is_some());

    let (status, fetched) =
        send(&app.router, get_request(&format!("/api/proyectos/{slug}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["titulo"], "Calidad del Agua en el Río Conchos");

    let (status, recent) = send(&app.router, get_request("/api/proyectos/recent", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_creator_or_an_admin_edits_a_project() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
        seed_user(conn, "Luis Pérez", "luis.perez@uach.mx", false);
        seed_user(conn, "Admin SEI", "admin@sei.mx", true);
    });
    let ana = login(&app.router, "ana.ruiz@uach.mx").await;
    let luis = login(&app.router, "luis.perez@uach.mx").await;
    let admin = login(&app.router, "admin@sei.mx").await;

    let (_, created) = send(
        &app.router,
        json_request(
            "POST",
            "/api/proyectos",
            Some(&ana),
            json!({
                "titulo": "Sequía",
                "descripcion": "d",
                "resumen": "r",
                "categoria": "c",
                "autor": "Ana Ruiz Soto",
                "institucion": "UACH",
                "fechaInicio": "2023-01-01",
            }),
        ),
    )
    .await;
    let uri = format!("/api/proyectos/{}", created["slug"].as_str().unwrap());

    let (status, _) = send(
        &app.router,
        axum::http::Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("authorization", format!("Bearer {luis}"))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        axum::http::Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("authorization", format!("Bearer {admin}"))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app.router, get_request(&uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cv_upload_stores_file_and_links_profile() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
    });
    let token = login(&app.router, "ana.ruiz@uach.mx").await;
    let pdf = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";

    let (status, body) = send(
        &app.router,
        multipart_request("/api/upload-cv", Some(&token), "file", "mi cv.pdf", "application/pdf", pdf),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/cvs/"));
    assert!(url.ends_with("-mi_cv.pdf"));
    assert_eq!(body["investigador"]["cv_url"], url);

    let stored = app
        .dir
        .path()
        .join("uploads")
        .join(url.trim_start_matches("/uploads/"));
    assert_eq!(std::fs::read(stored).unwrap(), pdf);
}

#[tokio::test]
async fn upload_rejects_wrong_type_and_anonymous_callers() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
    });

    let (status, _) = send(
        &app.router,
        multipart_request("/api/upload-cv", None, "file", "cv.pdf", "application/pdf", b"%PDF"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app.router, "ana.ruiz@uach.mx").await;
    let (status, body) = send(
        &app.router,
        multipart_request("/api/upload-cv", Some(&token), "file", "cv.docx", "application/msword", b"doc"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("PDF"));

    let (status, _) = send(
        &app.router,
        multipart_request(
            "/api/upload-fotografia",
            Some(&token),
            "file",
            "foto.png",
            "image/png",
            b"\x89PNG\r\n\x1a\n",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn pdf_extraction_maps_client_and_tool_failures() {
    let app = spawn_app(|_| {});

    let (status, body) = send(
        &app.router,
        multipart_request("/process-pdf", None, "file", "notas.txt", "text/plain", b"hola"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // The configured extractor binary does not exist.
    let (status, body) = send(
        &app.router,
        multipart_request("/api/ocr", None, "file", "cv.pdf", "application/pdf", b"%PDF-1.4"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("cannot start"));
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = spawn_app(|_| {});

    let (status, body) = send(&app.router, get_request("/api/investigadores/nadie-99", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn profile_update_reports_a_taken_email_as_conflict() {
    let app = spawn_app(|conn| {
        seed_user(conn, "Ana Ruiz Soto", "ana.ruiz@uach.mx", false);
        seed_user(conn, "Luis Pérez Lara", "luis.perez@uach.mx", false);
    });
    let token = login(&app.router, "ana.ruiz@uach.mx").await;

    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/investigadores/actual",
            Some(&token),
            json!({ "curp": "RUSA850101MCHZTN09" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/investigadores/actual",
            Some(&token),
            json!({ "curp": "RUSA850101MCHZTN09", "correo": "luis.perez@uach.mx" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "correo is already registered");
}
