//! Institution repository.
//!
//! # Invariants
//! - Institution names are unique ignoring ASCII case.
//! - Researcher counts join on `investigadores.institucion` by
//!   case-insensitive name, never by id.

use crate::db::now_epoch_ms;
use crate::model::institucion::{Institucion, InstitucionConConteo, InstitucionInput};
use crate::model::RowId;
use crate::repo::{ensure_connection_ready, int_to_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const INSTITUCION_COLUMNS_SQL: &str = "i.id,
    i.nombre,
    i.siglas,
    i.tipo,
    i.descripcion,
    i.ubicacion,
    i.sitio_web,
    i.imagen_url,
    i.activo,
    i.created_at,
    i.updated_at";

pub trait InstitucionRepository {
    fn create(&self, input: &InstitucionInput) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<InstitucionConConteo>>;
    /// Lists institutions by name with their affiliated researcher count.
    fn list(&self) -> RepoResult<Vec<InstitucionConConteo>>;
    fn update(&self, id: RowId, input: &InstitucionInput) -> RepoResult<Institucion>;
    fn delete(&self, id: RowId) -> RepoResult<()>;
    fn set_imagen_url(&self, id: RowId, url: &str) -> RepoResult<()>;
    fn count(&self) -> RepoResult<i64>;
}

pub struct SqliteInstitucionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInstitucionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["instituciones", "investigadores"])?;
        Ok(Self { conn })
    }

    fn ensure_unique_name(&self, nombre: &str, except_id: Option<RowId>) -> RepoResult<()> {
        let existing: Option<RowId> = self
            .conn
            .query_row(
                "SELECT id FROM instituciones
                 WHERE nombre = ?1 COLLATE NOCASE AND (?2 IS NULL OR id <> ?2);",
                params![nombre, except_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(existing_id) => Err(RepoError::Duplicate {
                field: "nombre",
                existing_id,
            }),
            None => Ok(()),
        }
    }
}

impl InstitucionRepository for SqliteInstitucionRepository<'_> {
    fn create(&self, input: &InstitucionInput) -> RepoResult<RowId> {
        input.validate()?;
        let nombre = input.nombre.as_deref().unwrap_or_default();
        self.ensure_unique_name(nombre, None)?;

        self.conn.execute(
            "INSERT INTO instituciones (nombre, siglas, tipo, descripcion, ubicacion, sitio_web)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                nombre,
                input.siglas.as_deref(),
                input.tipo.as_deref(),
                input.descripcion.as_deref(),
                input.ubicacion.as_deref(),
                input.sitio_web.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: RowId) -> RepoResult<Option<InstitucionConConteo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INSTITUCION_COLUMNS_SQL},
                (SELECT COUNT(*) FROM investigadores v
                 WHERE v.institucion = i.nombre COLLATE NOCASE) AS investigadores
             FROM instituciones i
             WHERE i.id = ?1;"
        ))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_con_conteo(row)?));
        }
        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<InstitucionConConteo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INSTITUCION_COLUMNS_SQL},
                (SELECT COUNT(*) FROM investigadores v
                 WHERE v.institucion = i.nombre COLLATE NOCASE) AS investigadores
             FROM instituciones i
             ORDER BY i.nombre COLLATE NOCASE ASC, i.id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_con_conteo(row)?);
        }
        Ok(items)
    }

    fn update(&self, id: RowId, input: &InstitucionInput) -> RepoResult<Institucion> {
        input.validate()?;
        let nombre = input.nombre.as_deref().unwrap_or_default();
        self.ensure_unique_name(nombre, Some(id))?;

        let changed = self.conn.execute(
            "UPDATE instituciones
             SET nombre = ?1,
                 siglas = ?2,
                 tipo = ?3,
                 descripcion = ?4,
                 ubicacion = ?5,
                 sitio_web = ?6,
                 updated_at = ?7
             WHERE id = ?8;",
            params![
                nombre,
                input.siglas.as_deref(),
                input.tipo.as_deref(),
                input.descripcion.as_deref(),
                input.ubicacion.as_deref(),
                input.sitio_web.as_deref(),
                now_epoch_ms(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("institucion", id));
        }
        self.get(id)?
            .map(|item| item.institucion)
            .ok_or_else(|| RepoError::not_found("institucion", id))
    }

    fn delete(&self, id: RowId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM instituciones WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("institucion", id));
        }
        Ok(())
    }

    fn set_imagen_url(&self, id: RowId, url: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE instituciones SET imagen_url = ?1, updated_at = ?2 WHERE id = ?3;",
            params![url, now_epoch_ms(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("institucion", id));
        }
        Ok(())
    }

    fn count(&self) -> RepoResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM instituciones;", [], |row| row.get(0))?)
    }
}

fn parse_con_conteo(row: &Row<'_>) -> RepoResult<InstitucionConConteo> {
    Ok(InstitucionConConteo {
        institucion: parse_institucion_row(row)?,
        investigadores: row.get("investigadores")?,
    })
}

pub(crate) fn parse_institucion_row(row: &Row<'_>) -> RepoResult<Institucion> {
    Ok(Institucion {
        id: row.get("id")?,
        nombre: row.get("nombre")?,
        siglas: row.get("siglas")?,
        tipo: row.get("tipo")?,
        descripcion: row.get("descripcion")?,
        ubicacion: row.get("ubicacion")?,
        sitio_web: row.get("sitio_web")?,
        imagen_url: row.get("imagen_url")?,
        activo: int_to_bool(row.get("activo")?, "instituciones.activo")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
