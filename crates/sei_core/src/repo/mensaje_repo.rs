//! Direct message repository.

use crate::db::now_epoch_ms;
use crate::model::mensaje::{Mensaje, MensajeVista, NuevoMensaje, TipoMensaje};
use crate::model::RowId;
use crate::repo::conexion_repo::parse_otro;
use crate::repo::{ensure_connection_ready, int_to_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub trait MensajeRepository {
    fn enviar(&self, remitente_id: RowId, input: &NuevoMensaje) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<Mensaje>>;
    /// Sent and received messages of `investigador_id`, newest first.
    fn listar(&self, investigador_id: RowId) -> RepoResult<Vec<MensajeVista>>;
    /// Returns `false` unless the message exists and is addressed to
    /// `destinatario_id`.
    fn marcar_leido(&self, id: RowId, destinatario_id: RowId) -> RepoResult<bool>;
    fn no_leidos(&self, destinatario_id: RowId) -> RepoResult<i64>;
}

pub struct SqliteMensajeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMensajeRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["mensajes", "investigadores"])?;
        Ok(Self { conn })
    }
}

impl MensajeRepository for SqliteMensajeRepository<'_> {
    fn enviar(&self, remitente_id: RowId, input: &NuevoMensaje) -> RepoResult<RowId> {
        input.validate()?;
        let destinatario_id = input.destinatario_id.unwrap_or_default();
        if destinatario_id == remitente_id {
            return Err(RepoError::InvalidState(
                "cannot send a message to yourself".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO mensajes (
                remitente_id, destinatario_id, asunto, mensaje, fecha_envio, mensaje_padre_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                remitente_id,
                destinatario_id,
                input.asunto.as_deref(),
                input.mensaje.as_deref(),
                now_epoch_ms(),
                input.mensaje_padre_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: RowId) -> RepoResult<Option<Mensaje>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, remitente_id, destinatario_id, asunto, mensaje, fecha_envio, leido,
                    mensaje_padre_id
             FROM mensajes WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_mensaje_row(row)?));
        }
        Ok(None)
    }

    fn listar(&self, investigador_id: RowId) -> RepoResult<Vec<MensajeVista>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                m.id,
                m.remitente_id,
                m.destinatario_id,
                m.asunto,
                m.mensaje,
                m.fecha_envio,
                m.leido,
                m.mensaje_padre_id,
                o.id AS otro_id,
                o.slug AS otro_slug,
                o.nombre_completo AS otro_nombre,
                o.correo AS otro_correo,
                o.fotografia_url AS otro_fotografia,
                o.institucion AS otro_institucion
             FROM mensajes m
             JOIN investigadores o
               ON o.id = CASE WHEN m.remitente_id = ?1 THEN m.destinatario_id ELSE m.remitente_id END
             WHERE m.remitente_id = ?1 OR m.destinatario_id = ?1
             ORDER BY m.fecha_envio DESC, m.id DESC;",
        )?;
        let mut rows = stmt.query([investigador_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let mensaje = parse_mensaje_row(row)?;
            let tipo = if mensaje.remitente_id == investigador_id {
                TipoMensaje::Enviado
            } else {
                TipoMensaje::Recibido
            };
            items.push(MensajeVista {
                mensaje,
                tipo,
                otro: parse_otro(row)?,
            });
        }
        Ok(items)
    }

    fn marcar_leido(&self, id: RowId, destinatario_id: RowId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE mensajes SET leido = 1 WHERE id = ?1 AND destinatario_id = ?2;",
            params![id, destinatario_id],
        )?;
        Ok(changed == 1)
    }

    fn no_leidos(&self, destinatario_id: RowId) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM mensajes WHERE destinatario_id = ?1 AND leido = 0;",
            [destinatario_id],
            |row| row.get(0),
        )?)
    }
}

fn parse_mensaje_row(row: &Row<'_>) -> RepoResult<Mensaje> {
    Ok(Mensaje {
        id: row.get("id")?,
        remitente_id: row.get("remitente_id")?,
        destinatario_id: row.get("destinatario_id")?,
        asunto: row.get("asunto")?,
        mensaje: row.get("mensaje")?,
        fecha_envio: row.get("fecha_envio")?,
        leido: int_to_bool(row.get("leido")?, "mensajes.leido")?,
        mensaje_padre_id: row.get("mensaje_padre_id")?,
    })
}
