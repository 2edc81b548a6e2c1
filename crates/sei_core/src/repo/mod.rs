//! Table-level persistence for the directory.
//!
//! Each `*_repo` module pairs a trait, used by the services, with its SQLite
//! implementation. Repositories are cheap borrows of one connection and are
//! built per unit of work.
//!
//! # Invariants
//! - `try_new` refuses a connection whose schema is not at the latest
//!   version or lacks a table the repository reads.
//! - Unique-key collisions surface as [`RepoError::Duplicate`], never as raw
//!   SQLite constraint errors.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::{RowId, ValidationError};
use log::warn;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

pub mod campo_repo;
pub mod conexion_repo;
pub mod convocatoria_repo;
pub mod credencial_repo;
pub mod institucion_repo;
pub mod investigador_repo;
pub mod mensaje_repo;
pub mod proyecto_repo;
pub mod publicacion_repo;
pub mod registro_repo;
pub mod sesion_repo;

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// A unique business key is already taken by `existing_id`, which is `0`
    /// when only the storage constraint caught the collision.
    Duplicate {
        field: &'static str,
        existing_id: RowId,
    },
    /// The row exists but its state forbids the requested transition.
    InvalidState(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Duplicate { field, existing_id } => {
                write!(f, "{field} already registered (id {existing_id})")
            }
            Self::InvalidState(message) => f.write_str(message),
            Self::InvalidData(message) => write!(f, "stored row is corrupt: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "database is at schema {actual_version}, expected {expected_version}; open it with sei_core::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, Some(message)) = &value {
            if err.code == ErrorCode::ConstraintViolation {
                if let Some(field) = unique_violation_field(message) {
                    return Self::Duplicate {
                        field,
                        existing_id: 0,
                    };
                }
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// First column named by a `UNIQUE constraint failed: table.column` message.
fn unique_violation_field(message: &str) -> Option<&'static str> {
    let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
    let column = columns.split(", ").next()?.rsplit('.').next()?;
    Some(match column {
        "curp" => "curp",
        "correo" => "correo",
        "slug" => "slug",
        "nombre" => "nombre",
        "codigo" => "codigo",
        "origen_id" | "destino_id" => "conexion",
        _ => "registro",
    })
}

/// Checks the schema version and the presence of `tables` on `conn`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let mut stmt =
        conn.prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    for &table in tables {
        if !stmt.exists([table])? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Atomic group of writes on one connection.
///
/// Backed by a SQLite savepoint, so scopes nest: an inner scope opened by a
/// repository method joins the scope a service opened around it. Dropping an
/// uncommitted scope rolls its writes back.
pub struct WriteScope<'conn> {
    conn: &'conn Connection,
    committed: bool,
}

impl<'conn> WriteScope<'conn> {
    pub fn begin(conn: &'conn Connection) -> RepoResult<Self> {
        conn.execute_batch("SAVEPOINT sei_write;")?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    pub fn commit(mut self) -> RepoResult<()> {
        self.conn.execute_batch("RELEASE sei_write;")?;
        self.committed = true;
        Ok(())
    }
}

impl Deref for WriteScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = self
            .conn
            .execute_batch("ROLLBACK TO sei_write; RELEASE sei_write;")
        {
            warn!("event=write_scope module=repo status=error reason=rollback error={err}");
        }
    }
}

/// Page size for list queries: default when unset or zero, never above the cap.
pub fn normalize_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_LIST_LIMIT,
        Some(value) if value > MAX_LIST_LIMIT => MAX_LIST_LIMIT,
        Some(value) => value,
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "{column} holds {other}, expected 0 or 1"
        ))),
    }
}
