//! Password credential storage, one row per researcher.

use crate::db::now_epoch_ms;
use crate::model::RowId;
use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Stored password digest and its hex salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credencial {
    pub investigador_id: RowId,
    pub password_hash: String,
    pub password_salt: String,
}

pub trait CredencialRepository {
    /// Inserts or replaces the researcher's credential.
    fn upsert(&self, credencial: &Credencial) -> RepoResult<()>;
    fn get(&self, investigador_id: RowId) -> RepoResult<Option<Credencial>>;
}

pub struct SqliteCredencialRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCredencialRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["credenciales"])?;
        Ok(Self { conn })
    }
}

impl CredencialRepository for SqliteCredencialRepository<'_> {
    fn upsert(&self, credencial: &Credencial) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO credenciales (investigador_id, password_hash, password_salt, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (investigador_id) DO UPDATE SET
                password_hash = excluded.password_hash,
                password_salt = excluded.password_salt,
                updated_at = excluded.updated_at;",
            params![
                credencial.investigador_id,
                credencial.password_hash.as_str(),
                credencial.password_salt.as_str(),
                now_epoch_ms(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, investigador_id: RowId) -> RepoResult<Option<Credencial>> {
        Ok(self
            .conn
            .query_row(
                "SELECT investigador_id, password_hash, password_salt
                 FROM credenciales WHERE investigador_id = ?1;",
                [investigador_id],
                |row| {
                    Ok(Credencial {
                        investigador_id: row.get(0)?,
                        password_hash: row.get(1)?,
                        password_salt: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }
}
