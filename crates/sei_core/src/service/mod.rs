//! Directory use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce cross-row business rules (duplicate identities, who may answer
//!   a connection, registration code expiry).
//! - Keep the HTTP and CLI layers decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository validation.
//! - Every error surfaced to callers is one of the semantic
//!   [`ServiceError`] variants; transport failures stay wrapped in `Repo`.

use crate::model::{RowId, ValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod campo_service;
pub mod conexion_service;
pub mod estadisticas_service;
pub mod investigador_service;
pub mod mensaje_service;
pub mod registro_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// A unique business key is already held by `existing_id`.
    Duplicate {
        field: &'static str,
        existing_id: RowId,
    },
    /// The request is well formed but not allowed in the current state.
    InvalidRequest(String),
    /// The caller does not own the row it tries to change.
    Forbidden(String),
    /// Registration code is unknown or expired.
    CodigoInvalido,
    /// The verification code could not be handed to the notifier.
    Notification(String),
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Duplicate { field, .. } => write!(f, "{field} is already registered"),
            Self::InvalidRequest(message) => write!(f, "{message}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::CodigoInvalido => write!(f, "verification code is invalid or expired"),
            Self::Notification(message) => write!(f, "cannot deliver verification code: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Duplicate { field, existing_id } => Self::Duplicate { field, existing_id },
            RepoError::InvalidState(message) => Self::InvalidRequest(message),
            other => Self::Repo(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_to_semantic_variants() {
        let err: ServiceError = RepoError::Duplicate {
            field: "curp",
            existing_id: 4,
        }
        .into();
        assert!(matches!(
            err,
            ServiceError::Duplicate {
                field: "curp",
                existing_id: 4
            }
        ));

        let err: ServiceError = RepoError::InvalidState("nope".to_string()).into();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));

        let err: ServiceError = RepoError::InvalidData("bad".to_string()).into();
        assert!(matches!(err, ServiceError::Repo(_)));
    }
}
