//! Bearer-token extractors.
//!
//! # Invariants
//! - Every successful extraction refreshes the caller's `ultima_actividad`.
//! - `AdminUser` is a `CurrentUser` whose `es_admin` flag is set.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use sei_core::{now_epoch_ms, SessionUser};

use crate::{error::AppError, services, state::AppState};

/// Raw token from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

/// Authenticated caller with the administrator role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .map(BearerToken)
            .ok_or_else(AppError::unauthorized)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let ttl = state.config.session_ttl;
        let user = state
            .db(move |conn| Ok(services::auth(conn, ttl)?.resolve(&token, now_epoch_ms())?))
            .await?;
        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.es_admin {
            return Err(AppError::admin_only());
        }
        Ok(AdminUser(user))
    }
}
