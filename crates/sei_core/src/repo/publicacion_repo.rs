//! Publication repository.

use crate::db::now_epoch_ms;
use crate::model::publicacion::{Publicacion, PublicacionInput};
use crate::model::RowId;
use crate::repo::{ensure_connection_ready, normalize_limit, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PUBLICACION_SELECT_SQL: &str = "SELECT
    id,
    titulo,
    autor,
    institucion,
    editorial,
    anio_creacion,
    doi,
    resumen,
    palabras_clave,
    categoria,
    tipo,
    acceso,
    volumen,
    numero,
    paginas,
    archivo_url,
    creado_por,
    created_at,
    updated_at
FROM publicaciones";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicacionListQuery {
    /// Case-insensitive substring of `autor`.
    pub autor: Option<String>,
    pub categoria: Option<String>,
    pub anio: Option<i32>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait PublicacionRepository {
    fn create(&self, input: &PublicacionInput, creado_por: Option<RowId>) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<Publicacion>>;
    fn list(&self, query: &PublicacionListQuery) -> RepoResult<Vec<Publicacion>>;
    fn update(&self, id: RowId, input: &PublicacionInput) -> RepoResult<Publicacion>;
    fn delete(&self, id: RowId) -> RepoResult<()>;
    /// Distinct non-empty `editorial` values, alphabetically.
    fn revistas(&self) -> RepoResult<Vec<String>>;
    fn count(&self) -> RepoResult<i64>;
}

pub struct SqlitePublicacionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePublicacionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["publicaciones"])?;
        Ok(Self { conn })
    }

    fn query_many(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Publicacion>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_publicacion_row(row)?);
        }
        Ok(items)
    }
}

impl PublicacionRepository for SqlitePublicacionRepository<'_> {
    fn create(&self, input: &PublicacionInput, creado_por: Option<RowId>) -> RepoResult<RowId> {
        input.validate()?;
        self.conn.execute(
            "INSERT INTO publicaciones (
                titulo,
                autor,
                institucion,
                editorial,
                anio_creacion,
                doi,
                resumen,
                palabras_clave,
                categoria,
                tipo,
                acceso,
                volumen,
                numero,
                paginas,
                archivo_url,
                creado_por
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                input.titulo.as_deref(),
                input.autor.as_deref(),
                input.institucion.as_deref(),
                input.editorial.as_deref(),
                input.anio_creacion,
                input.doi.as_deref(),
                input.resumen.as_deref(),
                input.palabras_clave.as_deref(),
                input.categoria.as_deref(),
                input.tipo.as_deref(),
                input.acceso.as_deref(),
                input.volumen.as_deref(),
                input.numero.as_deref(),
                input.paginas.as_deref(),
                input.archivo_url.as_deref(),
                creado_por,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: RowId) -> RepoResult<Option<Publicacion>> {
        Ok(self
            .query_many(
                &format!("{PUBLICACION_SELECT_SQL} WHERE id = ?1;"),
                vec![Value::Integer(id)],
            )?
            .into_iter()
            .next())
    }

    fn list(&self, query: &PublicacionListQuery) -> RepoResult<Vec<Publicacion>> {
        let mut sql = format!("{PUBLICACION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();
        if let Some(autor) = query.autor.as_ref().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            sql.push_str(" AND autor LIKE '%' || ? || '%'");
            bind_values.push(Value::Text(autor.to_string()));
        }
        if let Some(categoria) = query.categoria.as_ref() {
            sql.push_str(" AND categoria = ? COLLATE NOCASE");
            bind_values.push(Value::Text(categoria.trim().to_string()));
        }
        if let Some(anio) = query.anio {
            sql.push_str(" AND anio_creacion = ?");
            bind_values.push(Value::Integer(i64::from(anio)));
        }
        sql.push_str(
            " ORDER BY COALESCE(anio_creacion, 0) DESC, created_at DESC, id DESC LIMIT ? OFFSET ?",
        );
        bind_values.push(Value::Integer(i64::from(normalize_limit(query.limit))));
        bind_values.push(Value::Integer(i64::from(query.offset)));
        self.query_many(&sql, bind_values)
    }

    fn update(&self, id: RowId, input: &PublicacionInput) -> RepoResult<Publicacion> {
        input.validate()?;
        let changed = self.conn.execute(
            "UPDATE publicaciones
             SET titulo = ?1,
                 autor = ?2,
                 institucion = ?3,
                 editorial = ?4,
                 anio_creacion = ?5,
                 doi = ?6,
                 resumen = ?7,
                 palabras_clave = ?8,
                 categoria = ?9,
                 tipo = ?10,
                 acceso = ?11,
                 volumen = ?12,
                 numero = ?13,
                 paginas = ?14,
                 archivo_url = ?15,
                 updated_at = ?16
             WHERE id = ?17;",
            params![
                input.titulo.as_deref(),
                input.autor.as_deref(),
                input.institucion.as_deref(),
                input.editorial.as_deref(),
                input.anio_creacion,
                input.doi.as_deref(),
                input.resumen.as_deref(),
                input.palabras_clave.as_deref(),
                input.categoria.as_deref(),
                input.tipo.as_deref(),
                input.acceso.as_deref(),
                input.volumen.as_deref(),
                input.numero.as_deref(),
                input.paginas.as_deref(),
                input.archivo_url.as_deref(),
                now_epoch_ms(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("publicacion", id));
        }
        self.get(id)?
            .ok_or_else(|| RepoError::not_found("publicacion", id))
    }

    fn delete(&self, id: RowId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM publicaciones WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("publicacion", id));
        }
        Ok(())
    }

    fn revistas(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT editorial
             FROM publicaciones
             WHERE editorial IS NOT NULL AND trim(editorial) <> ''
             ORDER BY editorial COLLATE NOCASE ASC;",
        )?;
        let revistas = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(revistas)
    }

    fn count(&self) -> RepoResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM publicaciones;", [], |row| row.get(0))?)
    }
}

fn parse_publicacion_row(row: &Row<'_>) -> RepoResult<Publicacion> {
    Ok(Publicacion {
        id: row.get("id")?,
        titulo: row.get("titulo")?,
        autor: row.get("autor")?,
        institucion: row.get("institucion")?,
        editorial: row.get("editorial")?,
        anio_creacion: row.get("anio_creacion")?,
        doi: row.get("doi")?,
        resumen: row.get("resumen")?,
        palabras_clave: row.get("palabras_clave")?,
        categoria: row.get("categoria")?,
        tipo: row.get("tipo")?,
        acceso: row.get("acceso")?,
        volumen: row.get("volumen")?,
        numero: row.get("numero")?,
        paginas: row.get("paginas")?,
        archivo_url: row.get("archivo_url")?,
        creado_por: row.get("creado_por")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
