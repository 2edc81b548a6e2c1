//! HTTP API for the state researcher directory.
//!
//! # Responsibility
//! - Expose directory, account, messaging and extraction use cases as JSON
//!   routes over `sei_core`.
//! - Own the single database connection and run every query on the
//!   blocking pool.
//!
//! # Invariants
//! - Every error response is `{"error": "..."}` with a status from
//!   [`error::AppError`].
//! - Authenticated routes resolve the bearer session before touching data.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post, put},
    Router,
};
use log::{info, warn};
use sei_core::extract::MAX_UPLOAD_BYTES;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

use config::Config;
use routes::{
    admin, auth as auth_routes, campos, conexiones, convocatorias, cron, health, instituciones,
    investigadores, mensajes, ocr, proyectos, publicaciones, registro, search, uploads,
};
use state::AppState;

/// Multipart overhead allowed on top of the file itself.
const MULTIPART_SLACK_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_SLACK_BYTES);
    let cors = cors_layer(&state.config);
    let uploads_dir = ServeDir::new(state.config.upload_dir.clone());

    let api = Router::new()
        .route("/auth/login", post(auth_routes::login_handler))
        .route("/auth/logout", post(auth_routes::logout_handler))
        .route("/auth/me", get(auth_routes::me_handler))
        .route("/registro", post(registro::solicitar_handler))
        .route("/registro/completar", post(registro::completar_handler))
        .route("/investigadores", get(investigadores::list_handler))
        .route("/investigadores/search", get(investigadores::search_handler))
        .route("/investigadores/featured", get(investigadores::featured_handler))
        .route("/investigadores/incompletos", get(investigadores::incompletos_handler))
        .route(
            "/investigadores/actual",
            get(investigadores::actual_handler).put(investigadores::update_actual_handler),
        )
        .route("/investigadores/actividad", post(investigadores::actividad_handler))
        .route(
            "/investigadores/{key}",
            get(investigadores::perfil_handler).delete(investigadores::delete_handler),
        )
        .route(
            "/investigadores/{key}/relacionados",
            get(investigadores::relacionados_handler),
        )
        .route(
            "/investigadores/{key}/publicaciones",
            get(investigadores::publicaciones_handler),
        )
        .route("/investigadores/{key}/activar", post(investigadores::activar_handler))
        .route(
            "/investigadores/{key}/desactivar",
            post(investigadores::desactivar_handler),
        )
        .route(
            "/instituciones",
            get(instituciones::list_handler).post(instituciones::create_handler),
        )
        .route(
            "/instituciones/{id}",
            get(instituciones::get_handler)
                .put(instituciones::update_handler)
                .delete(instituciones::delete_handler),
        )
        .route(
            "/instituciones/{id}/imagen",
            post(instituciones::imagen_handler).layer(DefaultBodyLimit::max(
                uploads::MAX_IMAGE_BYTES + MULTIPART_SLACK_BYTES,
            )),
        )
        .route(
            "/proyectos",
            get(proyectos::list_handler).post(proyectos::create_handler),
        )
        .route("/proyectos/recent", get(proyectos::recent_handler))
        .route(
            "/proyectos/{slug}",
            get(proyectos::get_handler)
                .put(proyectos::update_handler)
                .delete(proyectos::delete_handler),
        )
        .route(
            "/publicaciones",
            get(publicaciones::list_handler).post(publicaciones::create_handler),
        )
        .route("/publicaciones/revistas", get(publicaciones::revistas_handler))
        .route(
            "/publicaciones/{id}",
            get(publicaciones::get_handler)
                .put(publicaciones::update_handler)
                .delete(publicaciones::delete_handler),
        )
        .route(
            "/convocatorias",
            get(convocatorias::list_handler).post(convocatorias::create_handler),
        )
        .route(
            "/convocatorias/{id}",
            get(convocatorias::get_handler)
                .put(convocatorias::update_handler)
                .delete(convocatorias::delete_handler),
        )
        .route(
            "/conexiones",
            get(conexiones::list_handler)
                .post(conexiones::solicitar_handler)
                .patch(conexiones::responder_handler),
        )
        .route("/conexiones/pendientes", get(conexiones::pendientes_handler))
        .route("/dashboard/sugerencias", get(conexiones::sugerencias_handler))
        .route("/conexiones/verificar", get(conexiones::verificar_handler))
        .route(
            "/mensajes",
            get(mensajes::list_handler).post(mensajes::enviar_handler),
        )
        .route("/mensajes/no-leidos", get(mensajes::no_leidos_handler))
        .route("/mensajes/{id}/leido", post(mensajes::leido_handler))
        .route("/search", get(search::search_handler))
        .route("/areas-populares", get(campos::areas_populares_handler))
        .route(
            "/instituciones-destacadas",
            get(campos::instituciones_destacadas_handler),
        )
        .route("/campos", get(campos::list_handler))
        .route("/campos/{slug}", get(campos::detalle_handler))
        .route("/estadisticas", get(admin::estadisticas_handler))
        .route("/admin/usuarios-stats", get(admin::usuarios_stats_handler))
        .route("/admin/evaluadores", get(admin::evaluadores_handler))
        .route("/admin/investigadores/{id}/roles", put(admin::roles_handler))
        .route("/admin/verificar-acceso", get(admin::verificar_acceso_handler))
        .route(
            "/upload-cv",
            post(uploads::upload_cv_handler).layer(upload_limit.clone()),
        )
        .route(
            "/upload-fotografia",
            post(uploads::upload_fotografia_handler).layer(DefaultBodyLimit::max(
                uploads::MAX_IMAGE_BYTES + MULTIPART_SLACK_BYTES,
            )),
        )
        .route("/ocr", post(ocr::ocr_handler).layer(upload_limit.clone()))
        .route("/cron/limpiar-registros", get(cron::limpiar_registros_handler));

    Router::new()
        .route("/", get(health::banner_handler))
        .route("/health", get(health::health_handler))
        .route("/process-pdf", post(ocr::process_pdf_handler).layer(upload_limit))
        .nest("/api", api)
        .nest_service("/uploads", uploads_dir)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring invalid CORS origin `{origin}`: {err}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Opens the database, binds the listener and serves until a shutdown
/// signal arrives.
pub async fn start_server(config: Config) -> Result<(), String> {
    match config.log_dir.as_deref() {
        Some(dir) => sei_core::init_logging(&config.log_level, dir)?,
        None => sei_core::init_stderr_logging(&config.log_level)?,
    }

    info!("Initializing state...");
    std::fs::create_dir_all(&config.upload_dir).map_err(|err| {
        format!(
            "cannot create upload directory `{}`: {err}",
            config.upload_dir.display()
        )
    })?;
    let conn = sei_core::open_db(&config.db_path)
        .map_err(|err| format!("cannot open `{}`: {err}", config.db_path.display()))?;

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config, conn);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|err| format!("cannot bind {address}: {err}"))?;
    info!("event=server_start module=server status=ok address={address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("server error: {err}"))?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
