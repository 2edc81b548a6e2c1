//! Researcher repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and directory queries over `investigadores`.
//! - Assign the public slug in the same transaction as the insert.
//!
//! # Invariants
//! - Every inserted row gets `slug = generate_slug(nombre)-id`.
//! - Email comparisons are case-insensitive; CURP comparisons are exact.
//! - Listing order is deterministic (`nombre_completo`, then `id`).

use crate::db::now_epoch_ms;
use crate::model::investigador::{Investigador, InvestigadorUpdate, NuevoInvestigador, Origen};
use crate::model::RowId;
use crate::repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, normalize_limit, RepoError, RepoResult,
    WriteScope,
};
use crate::slug::{generate_slug, unique_slug};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

pub(crate) const INVESTIGADOR_SELECT_SQL: &str = "SELECT
    id,
    slug,
    nombre_completo,
    curp,
    rfc,
    no_cvu,
    orcid,
    correo,
    telefono,
    institucion,
    area,
    linea_investigacion,
    nivel,
    sni,
    grado_maximo_estudios,
    fecha_nacimiento,
    experiencia_laboral,
    proyectos_investigacion,
    articulos,
    libros,
    capitulos_libros,
    fotografia_url,
    cv_url,
    origen,
    es_admin,
    es_evaluador,
    activo,
    ultima_actividad,
    fecha_registro,
    updated_at
FROM investigadores";

/// Filters for researcher listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvestigadorListQuery {
    /// `Some(true)` restricts to active profiles.
    pub activo: Option<bool>,
    /// Case-insensitive exact institution name.
    pub institucion: Option<String>,
    /// Case-insensitive exact research area.
    pub area: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Business key that collided with an existing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKey {
    Curp,
    Correo,
    Nombre,
}

impl DuplicateKey {
    pub fn field(self) -> &'static str {
        match self {
            Self::Curp => "curp",
            Self::Correo => "correo",
            Self::Nombre => "nombre_completo",
        }
    }
}

/// Uploaded file linked to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivoPerfil {
    Cv,
    Fotografia,
}

/// Repository interface for researcher profiles.
pub trait InvestigadorRepository {
    fn create(&self, input: &NuevoInvestigador) -> RepoResult<RowId>;
    fn get(&self, id: RowId) -> RepoResult<Option<Investigador>>;
    fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Investigador>>;
    fn get_by_correo(&self, correo: &str) -> RepoResult<Option<Investigador>>;
    /// Checks CURP, then email, then (only when CURP is absent) full name.
    /// The row `except_id` never counts as a collision.
    fn find_duplicate(
        &self,
        curp: Option<&str>,
        correo: Option<&str>,
        nombre: Option<&str>,
        except_id: Option<RowId>,
    ) -> RepoResult<Option<(DuplicateKey, RowId)>>;
    fn list(&self, query: &InvestigadorListQuery) -> RepoResult<Vec<Investigador>>;
    fn update(&self, id: RowId, update: InvestigadorUpdate) -> RepoResult<Investigador>;
    fn delete(&self, id: RowId) -> RepoResult<()>;
    fn set_activo(&self, id: RowId, activo: bool) -> RepoResult<()>;
    fn set_roles(&self, id: RowId, es_admin: bool, es_evaluador: bool) -> RepoResult<()>;
    fn set_archivo(&self, id: RowId, archivo: ArchivoPerfil, url: &str) -> RepoResult<()>;
    fn touch_actividad(&self, id: RowId, at_epoch_ms: i64) -> RepoResult<()>;
    fn list_incompletos(&self, limit: Option<u32>) -> RepoResult<Vec<Investigador>>;
    fn relacionados(&self, id: RowId, limit: Option<u32>) -> RepoResult<Vec<Investigador>>;
    fn featured(&self, limit: Option<u32>) -> RepoResult<Vec<Investigador>>;
    fn list_evaluadores(&self) -> RepoResult<Vec<Investigador>>;
    fn count(&self, solo_activos: bool) -> RepoResult<i64>;
    fn count_activos_desde(&self, since_epoch_ms: i64) -> RepoResult<i64>;
}

/// SQLite-backed researcher repository.
pub struct SqliteInvestigadorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInvestigadorRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["investigadores"])?;
        Ok(Self { conn })
    }

    fn query_many(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Investigador>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_investigador_row(row)?);
        }
        Ok(items)
    }

    fn query_one(&self, where_sql: &str, key: Value) -> RepoResult<Option<Investigador>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INVESTIGADOR_SELECT_SQL} WHERE {where_sql};"))?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_investigador_row(row)?));
        }
        Ok(None)
    }

    fn require(&self, id: RowId) -> RepoResult<Investigador> {
        self.get(id)?
            .ok_or_else(|| RepoError::not_found("investigador", id))
    }

    fn expect_changed(changed: usize, id: RowId) -> RepoResult<()> {
        if changed == 0 {
            return Err(RepoError::not_found("investigador", id));
        }
        Ok(())
    }
}

impl InvestigadorRepository for SqliteInvestigadorRepository<'_> {
    fn create(&self, input: &NuevoInvestigador) -> RepoResult<RowId> {
        input.validate()?;

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "INSERT INTO investigadores (
                nombre_completo,
                curp,
                rfc,
                no_cvu,
                orcid,
                correo,
                telefono,
                institucion,
                area,
                linea_investigacion,
                nivel,
                sni,
                grado_maximo_estudios,
                fecha_nacimiento,
                experiencia_laboral,
                proyectos_investigacion,
                articulos,
                libros,
                capitulos_libros,
                origen
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20);",
            params![
                input.nombre_completo.as_str(),
                input.curp.as_deref(),
                input.rfc.as_deref(),
                input.no_cvu.as_deref(),
                input.orcid.as_deref(),
                input.correo.as_deref(),
                input.telefono.as_deref(),
                input.institucion.as_deref(),
                input.area.as_deref(),
                input.linea_investigacion.as_deref(),
                input.nivel.as_deref(),
                input.sni.as_deref(),
                input.grado_maximo_estudios.as_deref(),
                input.fecha_nacimiento.as_deref(),
                input.experiencia_laboral.as_deref(),
                input.proyectos_investigacion.as_deref(),
                input.articulos.as_deref(),
                input.libros.as_deref(),
                input.capitulos_libros.as_deref(),
                input.origen.as_db(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        let base = if input.nombre_completo.is_empty() {
            "investigador".to_string()
        } else {
            generate_slug(&input.nombre_completo)
        };
        tx.execute(
            "UPDATE investigadores SET slug = ?1 WHERE id = ?2;",
            params![unique_slug(&base, id), id],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn get(&self, id: RowId) -> RepoResult<Option<Investigador>> {
        self.query_one("id = ?1", Value::Integer(id))
    }

    fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Investigador>> {
        self.query_one("slug = ?1", Value::Text(slug.to_string()))
    }

    fn get_by_correo(&self, correo: &str) -> RepoResult<Option<Investigador>> {
        self.query_one(
            "correo = ?1 COLLATE NOCASE",
            Value::Text(correo.trim().to_string()),
        )
    }

    fn find_duplicate(
        &self,
        curp: Option<&str>,
        correo: Option<&str>,
        nombre: Option<&str>,
        except_id: Option<RowId>,
    ) -> RepoResult<Option<(DuplicateKey, RowId)>> {
        let lookup = |condition: &str, key: &str| -> RepoResult<Option<RowId>> {
            Ok(self
                .conn
                .query_row(
                    &format!(
                        "SELECT id FROM investigadores
                         WHERE {condition} AND (?2 IS NULL OR id <> ?2)
                         ORDER BY id LIMIT 1;"
                    ),
                    params![key, except_id],
                    |row| row.get::<_, RowId>(0),
                )
                .optional()?)
        };

        if let Some(curp) = curp.filter(|value| !value.is_empty()) {
            if let Some(id) = lookup("curp = ?1", curp)? {
                return Ok(Some((DuplicateKey::Curp, id)));
            }
        }
        if let Some(correo) = correo.filter(|value| !value.is_empty()) {
            if let Some(id) = lookup("correo = ?1 COLLATE NOCASE", correo)? {
                return Ok(Some((DuplicateKey::Correo, id)));
            }
        }
        if curp.map_or(true, str::is_empty) {
            if let Some(nombre) = nombre.filter(|value| !value.is_empty()) {
                if let Some(id) = lookup("nombre_completo = ?1 COLLATE NOCASE", nombre)? {
                    return Ok(Some((DuplicateKey::Nombre, id)));
                }
            }
        }
        Ok(None)
    }

    fn list(&self, query: &InvestigadorListQuery) -> RepoResult<Vec<Investigador>> {
        let mut sql = format!("{INVESTIGADOR_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(activo) = query.activo {
            sql.push_str(" AND activo = ?");
            bind_values.push(Value::Integer(bool_to_int(activo)));
        }
        if let Some(institucion) = query.institucion.as_ref() {
            sql.push_str(" AND institucion = ? COLLATE NOCASE");
            bind_values.push(Value::Text(institucion.trim().to_string()));
        }
        if let Some(area) = query.area.as_ref() {
            sql.push_str(" AND area = ? COLLATE NOCASE");
            bind_values.push(Value::Text(area.trim().to_string()));
        }

        sql.push_str(" ORDER BY nombre_completo COLLATE NOCASE ASC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        self.query_many(&sql, bind_values)
    }

    fn update(&self, id: RowId, mut update: InvestigadorUpdate) -> RepoResult<Investigador> {
        update.normalize();
        update.validate()?;

        let mut current = self.require(id)?;
        update.apply_to(&mut current);

        let changed = self.conn.execute(
            "UPDATE investigadores
             SET
                nombre_completo = ?1,
                curp = ?2,
                rfc = ?3,
                no_cvu = ?4,
                orcid = ?5,
                correo = ?6,
                telefono = ?7,
                institucion = ?8,
                area = ?9,
                linea_investigacion = ?10,
                nivel = ?11,
                sni = ?12,
                grado_maximo_estudios = ?13,
                fecha_nacimiento = ?14,
                experiencia_laboral = ?15,
                proyectos_investigacion = ?16,
                articulos = ?17,
                libros = ?18,
                capitulos_libros = ?19,
                updated_at = ?20
             WHERE id = ?21;",
            params![
                current.nombre_completo.as_str(),
                current.curp.as_deref(),
                current.rfc.as_deref(),
                current.no_cvu.as_deref(),
                current.orcid.as_deref(),
                current.correo.as_deref(),
                current.telefono.as_deref(),
                current.institucion.as_deref(),
                current.area.as_deref(),
                current.linea_investigacion.as_deref(),
                current.nivel.as_deref(),
                current.sni.as_deref(),
                current.grado_maximo_estudios.as_deref(),
                current.fecha_nacimiento.as_deref(),
                current.experiencia_laboral.as_deref(),
                current.proyectos_investigacion.as_deref(),
                current.articulos.as_deref(),
                current.libros.as_deref(),
                current.capitulos_libros.as_deref(),
                now_epoch_ms(),
                id,
            ],
        )?;
        Self::expect_changed(changed, id)?;
        self.require(id)
    }

    fn delete(&self, id: RowId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM investigadores WHERE id = ?1;", [id])?;
        Self::expect_changed(changed, id)
    }

    fn set_activo(&self, id: RowId, activo: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE investigadores SET activo = ?1, updated_at = ?2 WHERE id = ?3;",
            params![bool_to_int(activo), now_epoch_ms(), id],
        )?;
        Self::expect_changed(changed, id)
    }

    fn set_roles(&self, id: RowId, es_admin: bool, es_evaluador: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE investigadores
             SET es_admin = ?1, es_evaluador = ?2, updated_at = ?3
             WHERE id = ?4;",
            params![
                bool_to_int(es_admin),
                bool_to_int(es_evaluador),
                now_epoch_ms(),
                id
            ],
        )?;
        Self::expect_changed(changed, id)
    }

    fn set_archivo(&self, id: RowId, archivo: ArchivoPerfil, url: &str) -> RepoResult<()> {
        let column = match archivo {
            ArchivoPerfil::Cv => "cv_url",
            ArchivoPerfil::Fotografia => "fotografia_url",
        };
        let changed = self.conn.execute(
            &format!("UPDATE investigadores SET {column} = ?1, updated_at = ?2 WHERE id = ?3;"),
            params![url, now_epoch_ms(), id],
        )?;
        Self::expect_changed(changed, id)
    }

    fn touch_actividad(&self, id: RowId, at_epoch_ms: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE investigadores SET ultima_actividad = ?1 WHERE id = ?2;",
            params![at_epoch_ms, id],
        )?;
        Self::expect_changed(changed, id)
    }

    fn list_incompletos(&self, limit: Option<u32>) -> RepoResult<Vec<Investigador>> {
        self.query_many(
            &format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE curp IS NULL
                    OR rfc IS NULL
                    OR no_cvu IS NULL
                    OR correo IS NULL
                    OR telefono IS NULL
                    OR institucion IS NULL
                    OR nombre_completo = ''
                 ORDER BY fecha_registro DESC, id DESC
                 LIMIT ?1;"
            ),
            vec![Value::Integer(i64::from(normalize_limit(limit)))],
        )
    }

    fn relacionados(&self, id: RowId, limit: Option<u32>) -> RepoResult<Vec<Investigador>> {
        let target = self.require(id)?;
        if target.area.is_none() && target.institucion.is_none() {
            return Ok(Vec::new());
        }

        let area = target.area.map(Value::Text).unwrap_or(Value::Null);
        let institucion = target.institucion.map(Value::Text).unwrap_or(Value::Null);
        self.query_many(
            &format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE activo = 1
                   AND id <> ?1
                   AND ((?2 IS NOT NULL AND area = ?2 COLLATE NOCASE)
                     OR (?3 IS NOT NULL AND institucion = ?3 COLLATE NOCASE))
                 ORDER BY (area = ?2 COLLATE NOCASE) DESC,
                          nombre_completo COLLATE NOCASE ASC,
                          id ASC
                 LIMIT ?4;"
            ),
            vec![
                Value::Integer(id),
                area,
                institucion,
                Value::Integer(i64::from(normalize_limit(limit))),
            ],
        )
    }

    fn featured(&self, limit: Option<u32>) -> RepoResult<Vec<Investigador>> {
        self.query_many(
            &format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE activo = 1 AND nombre_completo <> ''
                 ORDER BY
                    (curp IS NOT NULL) + (no_cvu IS NOT NULL) + (orcid IS NOT NULL)
                        + (fotografia_url IS NOT NULL) + (linea_investigacion IS NOT NULL)
                        + (articulos IS NOT NULL) + (libros IS NOT NULL) DESC,
                    COALESCE(ultima_actividad, 0) DESC,
                    id ASC
                 LIMIT ?1;"
            ),
            vec![Value::Integer(i64::from(normalize_limit(limit)))],
        )
    }

    fn list_evaluadores(&self) -> RepoResult<Vec<Investigador>> {
        self.query_many(
            &format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE es_evaluador = 1
                 ORDER BY nombre_completo COLLATE NOCASE ASC, id ASC;"
            ),
            Vec::new(),
        )
    }

    fn count(&self, solo_activos: bool) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM investigadores WHERE (?1 = 0 OR activo = 1);",
            [bool_to_int(solo_activos)],
            |row| row.get(0),
        )?)
    }

    fn count_activos_desde(&self, since_epoch_ms: i64) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM investigadores WHERE ultima_actividad >= ?1;",
            [since_epoch_ms],
            |row| row.get(0),
        )?)
    }
}

pub(crate) fn parse_investigador_row(row: &Row<'_>) -> RepoResult<Investigador> {
    let origen_text: String = row.get("origen")?;
    let origen = Origen::from_db(&origen_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid origen `{origen_text}` in investigadores.origen"
        ))
    })?;

    Ok(Investigador {
        id: row.get("id")?,
        slug: row.get("slug")?,
        nombre_completo: row.get("nombre_completo")?,
        curp: row.get("curp")?,
        rfc: row.get("rfc")?,
        no_cvu: row.get("no_cvu")?,
        orcid: row.get("orcid")?,
        correo: row.get("correo")?,
        telefono: row.get("telefono")?,
        institucion: row.get("institucion")?,
        area: row.get("area")?,
        linea_investigacion: row.get("linea_investigacion")?,
        nivel: row.get("nivel")?,
        sni: row.get("sni")?,
        grado_maximo_estudios: row.get("grado_maximo_estudios")?,
        fecha_nacimiento: row.get("fecha_nacimiento")?,
        experiencia_laboral: row.get("experiencia_laboral")?,
        proyectos_investigacion: row.get("proyectos_investigacion")?,
        articulos: row.get("articulos")?,
        libros: row.get("libros")?,
        capitulos_libros: row.get("capitulos_libros")?,
        fotografia_url: row.get("fotografia_url")?,
        cv_url: row.get("cv_url")?,
        origen,
        es_admin: int_to_bool(row.get("es_admin")?, "investigadores.es_admin")?,
        es_evaluador: int_to_bool(row.get("es_evaluador")?, "investigadores.es_evaluador")?,
        activo: int_to_bool(row.get("activo")?, "investigadores.activo")?,
        ultima_actividad: row.get("ultima_actividad")?,
        fecha_registro: row.get("fecha_registro")?,
        updated_at: row.get("updated_at")?,
    })
}
