//! Pending self-service registrations.
//!
//! # Invariants
//! - A verification code identifies at most one pending row.
//! - Taking a registration by code removes it in the same transaction.

use crate::model::RowId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult, WriteScope};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistroPendiente {
    pub id: RowId,
    #[serde(skip)]
    pub codigo: String,
    pub nombre_completo: String,
    pub correo: String,
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub no_cvu: Option<String>,
    pub telefono: Option<String>,
    pub institucion: Option<String>,
    pub created_at: i64,
}

/// Fields captured by the registration form before verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NuevoRegistro {
    pub nombre_completo: String,
    pub correo: String,
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub no_cvu: Option<String>,
    pub telefono: Option<String>,
    pub institucion: Option<String>,
}

pub trait RegistroRepository {
    /// Stores a pending registration, replacing any earlier one for the same
    /// email. Returns `Duplicate { field: "codigo" }` on a code collision.
    fn insert(&self, input: &NuevoRegistro, codigo: &str, created_at: i64) -> RepoResult<RowId>;
    /// Removes and returns the registration matching `codigo`.
    fn take_by_codigo(&self, codigo: &str) -> RepoResult<Option<RegistroPendiente>>;
    fn delete_older_than(&self, cutoff_epoch_ms: i64) -> RepoResult<usize>;
    fn count(&self) -> RepoResult<i64>;
    /// Runs `work` as one unit: writes made through this connection inside
    /// it, by any repository, commit together or not at all.
    fn atomically<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;
}

pub struct SqliteRegistroRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistroRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["registros_pendientes"])?;
        Ok(Self { conn })
    }
}

impl RegistroRepository for SqliteRegistroRepository<'_> {
    fn insert(&self, input: &NuevoRegistro, codigo: &str, created_at: i64) -> RepoResult<RowId> {
        let existing_code: Option<RowId> = self
            .conn
            .query_row(
                "SELECT id FROM registros_pendientes WHERE codigo = ?1;",
                [codigo],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing_id) = existing_code {
            return Err(RepoError::Duplicate {
                field: "codigo",
                existing_id,
            });
        }

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "DELETE FROM registros_pendientes WHERE correo = ?1 COLLATE NOCASE;",
            [input.correo.as_str()],
        )?;
        tx.execute(
            "INSERT INTO registros_pendientes (
                codigo, nombre_completo, correo, curp, rfc, no_cvu, telefono, institucion,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                codigo,
                input.nombre_completo.as_str(),
                input.correo.as_str(),
                input.curp.as_deref(),
                input.rfc.as_deref(),
                input.no_cvu.as_deref(),
                input.telefono.as_deref(),
                input.institucion.as_deref(),
                created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn take_by_codigo(&self, codigo: &str) -> RepoResult<Option<RegistroPendiente>> {
        let tx = WriteScope::begin(self.conn)?;
        let mut registro = None;
        {
            let mut stmt = tx.prepare(
                "SELECT id, codigo, nombre_completo, correo, curp, rfc, no_cvu, telefono,
                        institucion, created_at
                 FROM registros_pendientes
                 WHERE codigo = ?1;",
            )?;
            let mut rows = stmt.query([codigo])?;
            if let Some(row) = rows.next()? {
                registro = Some(parse_registro_row(row)?);
            }
        }
        if let Some(registro) = registro.as_ref() {
            tx.execute(
                "DELETE FROM registros_pendientes WHERE id = ?1;",
                [registro.id],
            )?;
        }
        tx.commit()?;
        Ok(registro)
    }

    fn atomically<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let scope = WriteScope::begin(self.conn)?;
        let value = work()?;
        scope.commit()?;
        Ok(value)
    }

    fn delete_older_than(&self, cutoff_epoch_ms: i64) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM registros_pendientes WHERE created_at < ?1;",
            [cutoff_epoch_ms],
        )?)
    }

    fn count(&self) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM registros_pendientes;",
            [],
            |row| row.get(0),
        )?)
    }
}

fn parse_registro_row(row: &Row<'_>) -> RepoResult<RegistroPendiente> {
    Ok(RegistroPendiente {
        id: row.get("id")?,
        codigo: row.get("codigo")?,
        nombre_completo: row.get("nombre_completo")?,
        correo: row.get("correo")?,
        curp: row.get("curp")?,
        rfc: row.get("rfc")?,
        no_cvu: row.get("no_cvu")?,
        telefono: row.get("telefono")?,
        institucion: row.get("institucion")?,
        created_at: row.get("created_at")?,
    })
}
