use axum::{extract::State, http::HeaderMap, Json};
use log::{info, warn};
use sei_core::now_epoch_ms;
use serde_json::{json, Value};

use crate::{
    auth::bearer_token,
    error::{AppError, AppResult},
    services,
    state::AppState,
};

/// Scheduled cleanup of stale registrations and expired sessions.
///
/// When `CRON_SECRET` is configured the caller must present it as a bearer
/// token.
pub async fn limpiar_registros_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    if let Some(secret) = state.config.cron_secret.as_deref() {
        if bearer_token(&headers).as_deref() != Some(secret) {
            warn!("event=cron_cleanup module=server status=rejected reason=bad_secret");
            return Err(AppError::Unauthorized("invalid cron secret".to_string()));
        }
    }

    let notifier = state.notifier.clone();
    let ttl = state.config.session_ttl;
    let now = now_epoch_ms();
    let (registros, sesiones) = state
        .db(move |conn| {
            let registros = services::registro(conn, notifier)?.limpiar_expirados(now)?;
            let sesiones = services::auth(conn, ttl)?.purge_expired(now)?;
            Ok((registros, sesiones))
        })
        .await?;

    info!(
        "event=cron_cleanup module=server status=ok registros={registros} sesiones={sesiones}"
    );
    Ok(Json(json!({
        "success": true,
        "registros_eliminados": registros,
        "sesiones_eliminadas": sesiones,
    })))
}
