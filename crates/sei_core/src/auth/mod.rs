//! Authentication primitives.
//!
//! # Responsibility
//! - Derive and verify password digests.
//! - Issue, resolve and revoke bearer sessions.
//! - Describe the authenticated caller resolved from a session token.
//!
//! # Invariants
//! - Plain-text passwords are never stored or logged.
//! - Digest comparison runs in time independent of where bytes differ.

use crate::model::RowId;
use crate::repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password, PasswordDigest, MIN_PASSWORD_CHARS};
pub use session::{AuthService, DEFAULT_SESSION_TTL};

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    InvalidCredentials,
    /// Token unknown, revoked or expired.
    InvalidSession,
    /// Profile exists but is deactivated.
    InactiveAccount,
    WeakPassword {
        min_chars: usize,
    },
    Repo(RepoError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::InvalidSession => write!(f, "session is invalid or expired"),
            Self::InactiveAccount => write!(f, "account is deactivated"),
            Self::WeakPassword { min_chars } => {
                write!(f, "password must have at least {min_chars} characters")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Caller identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub investigador_id: RowId,
    pub slug: Option<String>,
    pub nombre_completo: String,
    pub correo: Option<String>,
    pub es_admin: bool,
    pub es_evaluador: bool,
}

impl SessionUser {
    /// Admins may act on any profile; everybody else only on their own.
    pub fn can_manage(&self, investigador_id: RowId) -> bool {
        self.es_admin || self.investigador_id == investigador_id
    }
}

/// Token issued by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: i64,
    pub usuario: SessionUser,
}
