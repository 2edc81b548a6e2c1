//! Research project repository.
//!
//! # Invariants
//! - Slugs are `generate_slug(titulo)-id`, assigned inside the insert
//!   transaction and regenerated when the title changes.
//! - Writes accept only inputs that pass [`ProyectoInput::validate`].

use crate::db::now_epoch_ms;
use crate::model::proyecto::{Proyecto, ProyectoInput};
use crate::model::RowId;
use crate::repo::{ensure_connection_ready, normalize_limit, RepoError, RepoResult, WriteScope};
use crate::slug::{generate_slug, unique_slug};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

pub(crate) const PROYECTO_SELECT_SQL: &str = "SELECT
    id,
    slug,
    titulo,
    descripcion,
    resumen,
    categoria,
    autor,
    institucion,
    fecha_inicio,
    fecha_fin,
    estado,
    palabras_clave,
    creado_por,
    created_at,
    updated_at
FROM proyectos";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProyectoListQuery {
    pub categoria: Option<String>,
    pub institucion: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait ProyectoRepository {
    fn create(&self, input: &ProyectoInput, creado_por: Option<RowId>) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<Proyecto>>;
    fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Proyecto>>;
    fn list(&self, query: &ProyectoListQuery) -> RepoResult<Vec<Proyecto>>;
    /// Newest projects first.
    fn recent(&self, limit: Option<u32>) -> RepoResult<Vec<Proyecto>>;
    fn update(&self, id: RowId, input: &ProyectoInput) -> RepoResult<Proyecto>;
    fn delete(&self, id: RowId) -> RepoResult<()>;
    fn count(&self) -> RepoResult<i64>;
}

pub struct SqliteProyectoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProyectoRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["proyectos"])?;
        Ok(Self { conn })
    }

    fn query_many(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Proyecto>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_proyecto_row(row)?);
        }
        Ok(items)
    }

    fn query_one(&self, where_sql: &str, key: Value) -> RepoResult<Option<Proyecto>> {
        Ok(self
            .query_many(
                &format!("{PROYECTO_SELECT_SQL} WHERE {where_sql} LIMIT 1;"),
                vec![key],
            )?
            .into_iter()
            .next())
    }
}

impl ProyectoRepository for SqliteProyectoRepository<'_> {
    fn create(&self, input: &ProyectoInput, creado_por: Option<RowId>) -> RepoResult<RowId> {
        input.validate()?;

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "INSERT INTO proyectos (
                titulo,
                descripcion,
                resumen,
                categoria,
                autor,
                institucion,
                fecha_inicio,
                fecha_fin,
                estado,
                palabras_clave,
                creado_por
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                input.titulo.as_deref(),
                input.descripcion.as_deref(),
                input.resumen.as_deref(),
                input.categoria.as_deref(),
                input.autor.as_deref(),
                input.institucion.as_deref(),
                input.fecha_inicio.as_deref(),
                input.fecha_fin.as_deref(),
                input.estado.as_deref(),
                input.palabras_clave.as_deref(),
                creado_por,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let base = generate_slug(input.titulo.as_deref().unwrap_or_default());
        tx.execute(
            "UPDATE proyectos SET slug = ?1 WHERE id = ?2;",
            params![unique_slug(&base, id), id],
        )?;
        tx.commit()?;
        Ok(id)
    }

    fn get(&self, id: RowId) -> RepoResult<Option<Proyecto>> {
        self.query_one("id = ?1", Value::Integer(id))
    }

    fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Proyecto>> {
        self.query_one("slug = ?1", Value::Text(slug.to_string()))
    }

    fn list(&self, query: &ProyectoListQuery) -> RepoResult<Vec<Proyecto>> {
        let mut sql = format!("{PROYECTO_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();
        if let Some(categoria) = query.categoria.as_ref() {
            sql.push_str(" AND categoria = ? COLLATE NOCASE");
            bind_values.push(Value::Text(categoria.trim().to_string()));
        }
        if let Some(institucion) = query.institucion.as_ref() {
            sql.push_str(" AND institucion = ? COLLATE NOCASE");
            bind_values.push(Value::Text(institucion.trim().to_string()));
        }
        sql.push_str(" ORDER BY fecha_inicio DESC, id DESC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(normalize_limit(query.limit))));
        bind_values.push(Value::Integer(i64::from(query.offset)));
        self.query_many(&sql, bind_values)
    }

    fn recent(&self, limit: Option<u32>) -> RepoResult<Vec<Proyecto>> {
        self.query_many(
            &format!("{PROYECTO_SELECT_SQL} ORDER BY created_at DESC, id DESC LIMIT ?1;"),
            vec![Value::Integer(i64::from(normalize_limit(limit)))],
        )
    }

    fn update(&self, id: RowId, input: &ProyectoInput) -> RepoResult<Proyecto> {
        input.validate()?;
        let slug = unique_slug(
            &generate_slug(input.titulo.as_deref().unwrap_or_default()),
            id,
        );

        let changed = self.conn.execute(
            "UPDATE proyectos
             SET slug = ?1,
                 titulo = ?2,
                 descripcion = ?3,
                 resumen = ?4,
                 categoria = ?5,
                 autor = ?6,
                 institucion = ?7,
                 fecha_inicio = ?8,
                 fecha_fin = ?9,
                 estado = ?10,
                 palabras_clave = ?11,
                 updated_at = ?12
             WHERE id = ?13;",
            params![
                slug,
                input.titulo.as_deref(),
                input.descripcion.as_deref(),
                input.resumen.as_deref(),
                input.categoria.as_deref(),
                input.autor.as_deref(),
                input.institucion.as_deref(),
                input.fecha_inicio.as_deref(),
                input.fecha_fin.as_deref(),
                input.estado.as_deref(),
                input.palabras_clave.as_deref(),
                now_epoch_ms(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("proyecto", id));
        }
        self.get(id)?
            .ok_or_else(|| RepoError::not_found("proyecto", id))
    }

    fn delete(&self, id: RowId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM proyectos WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("proyecto", id));
        }
        Ok(())
    }

    fn count(&self) -> RepoResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM proyectos;", [], |row| row.get(0))?)
    }
}

pub(crate) fn parse_proyecto_row(row: &Row<'_>) -> RepoResult<Proyecto> {
    Ok(Proyecto {
        id: row.get("id")?,
        slug: row.get("slug")?,
        titulo: row.get("titulo")?,
        descripcion: row.get("descripcion")?,
        resumen: row.get("resumen")?,
        categoria: row.get("categoria")?,
        autor: row.get("autor")?,
        institucion: row.get("institucion")?,
        fecha_inicio: row.get("fecha_inicio")?,
        fecha_fin: row.get("fecha_fin")?,
        estado: row.get("estado")?,
        palabras_clave: row.get("palabras_clave")?,
        creado_por: row.get("creado_por")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
