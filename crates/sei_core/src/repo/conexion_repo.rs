//! Researcher connection repository.
//!
//! # Responsibility
//! - Persist directed connection requests and their answers.
//! - Build per-viewer listings with the other party's public summary.
//!
//! # Invariants
//! - The insert and the "no edge in either direction" check run as one
//!   statement, so concurrent requests cannot create a reverse duplicate.
//! - State transitions only happen from `pendiente` and only for the
//!   destination researcher.

use crate::db::now_epoch_ms;
use crate::model::conexion::{Conexion, ConexionVista, EstadoConexion, TipoConexion};
use crate::model::investigador::ContactoResumen;
use crate::model::RowId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CONEXION_SELECT_SQL: &str = "SELECT
    c.id,
    c.origen_id,
    c.destino_id,
    c.estado,
    c.mensaje,
    c.fecha_solicitud,
    c.fecha_respuesta
FROM conexiones c";

pub trait ConexionRepository {
    /// Inserts a `pendiente` edge unless any edge already links the pair.
    fn solicitar(
        &self,
        origen_id: RowId,
        destino_id: RowId,
        mensaje: Option<&str>,
    ) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<Conexion>>;
    /// Moves a pending edge addressed to `destino_id` into `estado`.
    ///
    /// Returns `false` when no pending edge with that id and destination exists.
    fn responder(&self, id: RowId, destino_id: RowId, estado: EstadoConexion)
        -> RepoResult<bool>;
    /// Edges touching `investigador_id`, pending first, then newest first.
    fn listar(&self, investigador_id: RowId) -> RepoResult<Vec<ConexionVista>>;
    fn count_pendientes_recibidas(&self, investigador_id: RowId) -> RepoResult<i64>;
    /// Edge between two researchers in either direction.
    fn entre(&self, a: RowId, b: RowId) -> RepoResult<Option<Conexion>>;
}

pub struct SqliteConexionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConexionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["conexiones", "investigadores"])?;
        Ok(Self { conn })
    }
}

impl ConexionRepository for SqliteConexionRepository<'_> {
    fn solicitar(
        &self,
        origen_id: RowId,
        destino_id: RowId,
        mensaje: Option<&str>,
    ) -> RepoResult<RowId> {
        if origen_id == destino_id {
            return Err(RepoError::InvalidState(
                "cannot connect a researcher with themself".to_string(),
            ));
        }

        let inserted = self.conn.execute(
            "INSERT INTO conexiones (origen_id, destino_id, estado, mensaje, fecha_solicitud)
             SELECT ?1, ?2, 'pendiente', ?3, ?4
             WHERE NOT EXISTS (
                SELECT 1 FROM conexiones
                WHERE (origen_id = ?1 AND destino_id = ?2)
                   OR (origen_id = ?2 AND destino_id = ?1)
             );",
            params![origen_id, destino_id, mensaje, now_epoch_ms()],
        )?;
        if inserted == 1 {
            return Ok(self.conn.last_insert_rowid());
        }

        let existing = self
            .entre(origen_id, destino_id)?
            .map(|conexion| conexion.id)
            .unwrap_or_default();
        Err(RepoError::Duplicate {
            field: "conexion",
            existing_id: existing,
        })
    }

    fn get(&self, id: RowId) -> RepoResult<Option<Conexion>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONEXION_SELECT_SQL} WHERE c.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_conexion_row(row)?));
        }
        Ok(None)
    }

    fn responder(
        &self,
        id: RowId,
        destino_id: RowId,
        estado: EstadoConexion,
    ) -> RepoResult<bool> {
        if estado == EstadoConexion::Pendiente {
            return Err(RepoError::InvalidState(
                "a response must accept or reject".to_string(),
            ));
        }
        let changed = self.conn.execute(
            "UPDATE conexiones
             SET estado = ?1, fecha_respuesta = ?2
             WHERE id = ?3 AND destino_id = ?4 AND estado = 'pendiente';",
            params![estado.as_db(), now_epoch_ms(), id, destino_id],
        )?;
        Ok(changed == 1)
    }

    fn listar(&self, investigador_id: RowId) -> RepoResult<Vec<ConexionVista>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id,
                c.origen_id,
                c.destino_id,
                c.estado,
                c.mensaje,
                c.fecha_solicitud,
                c.fecha_respuesta,
                o.id AS otro_id,
                o.slug AS otro_slug,
                o.nombre_completo AS otro_nombre,
                o.correo AS otro_correo,
                o.fotografia_url AS otro_fotografia,
                o.institucion AS otro_institucion
             FROM conexiones c
             JOIN investigadores o
               ON o.id = CASE WHEN c.origen_id = ?1 THEN c.destino_id ELSE c.origen_id END
             WHERE c.origen_id = ?1 OR c.destino_id = ?1
             ORDER BY (c.estado = 'pendiente') DESC, c.fecha_solicitud DESC, c.id DESC;",
        )?;
        let mut rows = stmt.query([investigador_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let conexion = parse_conexion_row(row)?;
            let tipo = if conexion.origen_id == investigador_id {
                TipoConexion::Enviada
            } else {
                TipoConexion::Recibida
            };
            items.push(ConexionVista {
                conexion,
                tipo,
                otro: parse_otro(row)?,
            });
        }
        Ok(items)
    }

    fn count_pendientes_recibidas(&self, investigador_id: RowId) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM conexiones WHERE destino_id = ?1 AND estado = 'pendiente';",
            [investigador_id],
            |row| row.get(0),
        )?)
    }

    fn entre(&self, a: RowId, b: RowId) -> RepoResult<Option<Conexion>> {
        let id: Option<RowId> = self
            .conn
            .query_row(
                "SELECT id FROM conexiones
                 WHERE (origen_id = ?1 AND destino_id = ?2)
                    OR (origen_id = ?2 AND destino_id = ?1)
                 LIMIT 1;",
                params![a, b],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }
}

fn parse_conexion_row(row: &Row<'_>) -> RepoResult<Conexion> {
    let estado_text: String = row.get("estado")?;
    let estado = EstadoConexion::from_db(&estado_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid estado `{estado_text}` in conexiones.estado"))
    })?;
    Ok(Conexion {
        id: row.get("id")?,
        origen_id: row.get("origen_id")?,
        destino_id: row.get("destino_id")?,
        estado,
        mensaje: row.get("mensaje")?,
        fecha_solicitud: row.get("fecha_solicitud")?,
        fecha_respuesta: row.get("fecha_respuesta")?,
    })
}

/// Reads the `otro_*` columns shared by the social listings.
pub(crate) fn parse_otro(row: &Row<'_>) -> RepoResult<ContactoResumen> {
    Ok(ContactoResumen {
        id: row.get("otro_id")?,
        slug: row.get("otro_slug")?,
        nombre_completo: row.get("otro_nombre")?,
        correo: row.get("otro_correo")?,
        fotografia_url: row.get("otro_fotografia")?,
        institucion: row.get("otro_institucion")?,
    })
}
