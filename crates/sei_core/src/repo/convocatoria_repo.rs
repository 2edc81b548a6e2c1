//! Funding call repository.
//!
//! Dates are stored as `YYYY-MM-DD` text so lexical order equals calendar
//! order.

use crate::db::now_epoch_ms;
use crate::model::convocatoria::{Convocatoria, ConvocatoriaInput};
use crate::model::RowId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const DATE_FORMAT: &str = "%Y-%m-%d";

const CONVOCATORIA_SELECT_SQL: &str = "SELECT
    id,
    titulo,
    descripcion,
    organizacion,
    categoria,
    fecha_apertura,
    fecha_cierre,
    monto,
    pdf_url,
    created_at,
    updated_at
FROM convocatorias";

pub trait ConvocatoriaRepository {
    fn create(&self, input: &ConvocatoriaInput) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<Convocatoria>>;
    /// All calls ordered by closing date, soonest first.
    fn list(&self) -> RepoResult<Vec<Convocatoria>>;
    fn update(&self, id: RowId, input: &ConvocatoriaInput) -> RepoResult<Convocatoria>;
    fn delete(&self, id: RowId) -> RepoResult<()>;
    /// Calls whose window contains `hoy`.
    fn count_abiertas(&self, hoy: NaiveDate) -> RepoResult<i64>;
}

pub struct SqliteConvocatoriaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConvocatoriaRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["convocatorias"])?;
        Ok(Self { conn })
    }
}

impl ConvocatoriaRepository for SqliteConvocatoriaRepository<'_> {
    fn create(&self, input: &ConvocatoriaInput) -> RepoResult<RowId> {
        let (apertura, cierre) = input.validate()?;
        self.conn.execute(
            "INSERT INTO convocatorias (
                titulo, descripcion, organizacion, categoria,
                fecha_apertura, fecha_cierre, monto, pdf_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                input.titulo.as_deref(),
                input.descripcion.as_deref(),
                input.organizacion.as_deref(),
                input.categoria.as_deref(),
                apertura.format(DATE_FORMAT).to_string(),
                cierre.format(DATE_FORMAT).to_string(),
                input.monto.as_deref(),
                input.pdf_url.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: RowId) -> RepoResult<Option<Convocatoria>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONVOCATORIA_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_convocatoria_row(row)?));
        }
        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<Convocatoria>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONVOCATORIA_SELECT_SQL} ORDER BY fecha_cierre ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_convocatoria_row(row)?);
        }
        Ok(items)
    }

    fn update(&self, id: RowId, input: &ConvocatoriaInput) -> RepoResult<Convocatoria> {
        let (apertura, cierre) = input.validate()?;
        let changed = self.conn.execute(
            "UPDATE convocatorias
             SET titulo = ?1,
                 descripcion = ?2,
                 organizacion = ?3,
                 categoria = ?4,
                 fecha_apertura = ?5,
                 fecha_cierre = ?6,
                 monto = ?7,
                 pdf_url = ?8,
                 updated_at = ?9
             WHERE id = ?10;",
            params![
                input.titulo.as_deref(),
                input.descripcion.as_deref(),
                input.organizacion.as_deref(),
                input.categoria.as_deref(),
                apertura.format(DATE_FORMAT).to_string(),
                cierre.format(DATE_FORMAT).to_string(),
                input.monto.as_deref(),
                input.pdf_url.as_deref(),
                now_epoch_ms(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("convocatoria", id));
        }
        self.get(id)?
            .ok_or_else(|| RepoError::not_found("convocatoria", id))
    }

    fn delete(&self, id: RowId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM convocatorias WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("convocatoria", id));
        }
        Ok(())
    }

    fn count_abiertas(&self, hoy: NaiveDate) -> RepoResult<i64> {
        let hoy = hoy.format(DATE_FORMAT).to_string();
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM convocatorias
             WHERE fecha_apertura <= ?1 AND fecha_cierre >= ?1;",
            [hoy],
            |row| row.get(0),
        )?)
    }
}

fn parse_date_column(row: &Row<'_>, column: &str) -> RepoResult<NaiveDate> {
    let text: String = row.get(column)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{text}` in convocatorias.{column}"))
    })
}

fn parse_convocatoria_row(row: &Row<'_>) -> RepoResult<Convocatoria> {
    Ok(Convocatoria {
        id: row.get("id")?,
        titulo: row.get("titulo")?,
        descripcion: row.get("descripcion")?,
        organizacion: row.get("organizacion")?,
        categoria: row.get("categoria")?,
        fecha_apertura: parse_date_column(row, "fecha_apertura")?,
        fecha_cierre: parse_date_column(row, "fecha_cierre")?,
        monto: row.get("monto")?,
        pdf_url: row.get("pdf_url")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
