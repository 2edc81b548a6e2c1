use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use sei_core::extract::ExtractError;
use sei_core::repo::RepoError;
use sei_core::{AuthError, SearchError, ServiceError, ValidationError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The external text extractor failed.
    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized() -> Self {
        AppError::Unauthorized("authentication required".to_string())
    }

    pub fn admin_only() -> Self {
        AppError::Forbidden("administrator role required".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(detail) => {
                error!("event=http_error module=server status=error detail={detail:?}");
                "internal server error".to_string()
            }
            AppError::BadGateway(detail) => {
                warn!("event=http_error module=server status=upstream detail={detail:?}");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => err.into(),
            RepoError::NotFound { .. } => AppError::NotFound(value.to_string()),
            RepoError::Duplicate { .. } => AppError::Conflict(value.to_string()),
            RepoError::InvalidState(message) => AppError::BadRequest(message),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(err) => err.into(),
            ServiceError::NotFound { .. } => AppError::NotFound(value.to_string()),
            ServiceError::Duplicate { .. } => AppError::Conflict(value.to_string()),
            ServiceError::InvalidRequest(message) => AppError::BadRequest(message),
            ServiceError::Forbidden(_) => AppError::Forbidden(value.to_string()),
            ServiceError::CodigoInvalido => AppError::BadRequest(value.to_string()),
            ServiceError::Notification(_) => AppError::BadGateway(value.to_string()),
            ServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials | AuthError::InvalidSession => {
                AppError::Unauthorized(value.to_string())
            }
            AuthError::InactiveAccount => AppError::Forbidden(value.to_string()),
            AuthError::WeakPassword { .. } => AppError::BadRequest(value.to_string()),
            AuthError::Repo(err) => err.into(),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(value: SearchError) -> Self {
        match value {
            SearchError::InvalidQuery { .. } => AppError::BadRequest(value.to_string()),
            _ => AppError::Internal(value.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(value: ExtractError) -> Self {
        if value.is_upstream() {
            AppError::BadGateway(value.to_string())
        } else {
            AppError::BadRequest(value.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {value}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::StatusCode;
    use sei_core::extract::ExtractError;
    use sei_core::repo::RepoError;
    use sei_core::{AuthError, ServiceError, ValidationError};
    use std::time::Duration;

    #[test]
    fn service_errors_map_to_http_statuses() {
        let cases = [
            (
                ServiceError::Validation(ValidationError::MissingFields(vec!["correo"])),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::NotFound {
                    entity: "investigador",
                    key: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Duplicate {
                    field: "curp",
                    existing_id: 3,
                },
                StatusCode::CONFLICT,
            ),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::CodigoInvalido, StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::InactiveAccount).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn extractor_failures_split_between_client_and_upstream() {
        assert_eq!(
            AppError::from(ExtractError::EmptyUpload).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ExtractError::Timeout(Duration::from_secs(55))).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn schema_problems_are_internal() {
        let err = RepoError::MissingRequiredTable("investigadores");
        assert_eq!(
            AppError::from(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
