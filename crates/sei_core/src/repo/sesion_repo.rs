//! Bearer session storage.
//!
//! # Invariants
//! - Tokens are opaque strings; a session is valid while `expires_at > now`.
//! - Expired rows are ignored by `resolve` and removed by `purge_expired`.

use crate::model::RowId;
use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sesion {
    pub token: String,
    pub investigador_id: RowId,
    pub created_at: i64,
    pub expires_at: i64,
}

pub trait SesionRepository {
    fn create(&self, sesion: &Sesion) -> RepoResult<()>;
    /// Returns the owning researcher when the token exists and is unexpired.
    fn resolve(&self, token: &str, now_epoch_ms: i64) -> RepoResult<Option<RowId>>;
    fn revoke(&self, token: &str) -> RepoResult<bool>;
    fn revoke_all(&self, investigador_id: RowId) -> RepoResult<usize>;
    fn purge_expired(&self, now_epoch_ms: i64) -> RepoResult<usize>;
}

pub struct SqliteSesionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSesionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["sesiones"])?;
        Ok(Self { conn })
    }
}

impl SesionRepository for SqliteSesionRepository<'_> {
    fn create(&self, sesion: &Sesion) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO sesiones (token, investigador_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                sesion.token.as_str(),
                sesion.investigador_id,
                sesion.created_at,
                sesion.expires_at
            ],
        )?;
        Ok(())
    }

    fn resolve(&self, token: &str, now_epoch_ms: i64) -> RepoResult<Option<RowId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT investigador_id FROM sesiones WHERE token = ?1 AND expires_at > ?2;",
                params![token, now_epoch_ms],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn revoke(&self, token: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sesiones WHERE token = ?1;", [token])?;
        Ok(changed == 1)
    }

    fn revoke_all(&self, investigador_id: RowId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM sesiones WHERE investigador_id = ?1;",
            [investigador_id],
        )?)
    }

    fn purge_expired(&self, now_epoch_ms: i64) -> RepoResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM sesiones WHERE expires_at <= ?1;", [now_epoch_ms])?)
    }
}
