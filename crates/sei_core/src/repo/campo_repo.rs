//! Aggregate queries that group researchers by field and institution.
//!
//! # Invariants
//! - Only active profiles are counted.
//! - Fields and free-text affiliations are compared trimmed and ignoring
//!   ASCII case; the reported name is one stored spelling of the group.
//! - Ranking ties are broken by name, then id, so results are stable.

use crate::model::campo::{AreaPopular, CampoResumen, InstitucionDestacada};
use crate::model::institucion::Institucion;
use crate::model::investigador::Investigador;
use crate::model::proyecto::Proyecto;
use crate::repo::institucion_repo::{parse_institucion_row, INSTITUCION_COLUMNS_SQL};
use crate::repo::investigador_repo::{parse_investigador_row, INVESTIGADOR_SELECT_SQL};
use crate::repo::proyecto_repo::{parse_proyecto_row, PROYECTO_SELECT_SQL};
use crate::repo::{ensure_connection_ready, RepoResult};
use crate::slug::generate_slug;
use rusqlite::{params, Connection, Params, Row};

/// Areas shown for each highlighted institution.
const AREAS_POR_INSTITUCION: u32 = 5;

const LISTS_PROYECTOS_SQL: &str =
    "CASE WHEN TRIM(COALESCE(proyectos_investigacion, '')) <> '' THEN 1 ELSE 0 END";
const LISTS_ARTICULOS_SQL: &str =
    "CASE WHEN TRIM(COALESCE(articulos, '')) <> '' THEN 1 ELSE 0 END";

pub trait CampoRepository {
    /// Fields ranked by researcher count, then by members listing projects.
    fn areas_populares(&self, limit: u32) -> RepoResult<Vec<AreaPopular>>;
    /// Catalogued institutions with at least one affiliated researcher.
    fn instituciones_destacadas(&self, limit: u32) -> RepoResult<Vec<InstitucionDestacada>>;
    /// Free-text affiliations ranked the same way, for directories whose
    /// institution catalog is empty.
    fn afiliaciones_destacadas(&self, limit: u32) -> RepoResult<Vec<InstitucionDestacada>>;
    /// Every field with its counters, by name.
    fn campos(&self) -> RepoResult<Vec<CampoResumen>>;
    fn miembros(&self, campo: &str, limit: u32) -> RepoResult<Vec<Investigador>>;
    fn lineas(&self, campo: &str, limit: u32) -> RepoResult<Vec<String>>;
    fn proyectos(&self, campo: &str, limit: u32) -> RepoResult<Vec<Proyecto>>;
    fn instituciones(&self, campo: &str, limit: u32) -> RepoResult<Vec<Institucion>>;
}

pub struct SqliteCampoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCampoRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["investigadores", "instituciones", "proyectos"])?;
        Ok(Self { conn })
    }

    fn collect<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        parse: impl Fn(&Row<'_>) -> RepoResult<T>,
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse(row)?);
        }
        Ok(items)
    }

    fn areas_de(&self, institucion: &str) -> RepoResult<Vec<String>> {
        self.collect(
            "SELECT MIN(TRIM(area))
             FROM investigadores
             WHERE activo = 1
               AND TRIM(institucion) = TRIM(?1) COLLATE NOCASE
               AND TRIM(COALESCE(area, '')) <> ''
             GROUP BY TRIM(area) COLLATE NOCASE
             ORDER BY COUNT(*) DESC, MIN(TRIM(area)) COLLATE NOCASE ASC
             LIMIT ?2;",
            params![institucion, AREAS_POR_INSTITUCION],
            |row| Ok(row.get(0)?),
        )
    }

    fn with_areas(
        &self,
        mut items: Vec<InstitucionDestacada>,
    ) -> RepoResult<Vec<InstitucionDestacada>> {
        for item in &mut items {
            item.areas = self.areas_de(&item.nombre)?;
        }
        Ok(items)
    }
}

impl CampoRepository for SqliteCampoRepository<'_> {
    fn areas_populares(&self, limit: u32) -> RepoResult<Vec<AreaPopular>> {
        self.collect(
            &format!(
                "SELECT MIN(TRIM(area)) AS nombre,
                        COUNT(*) AS n_investigadores,
                        SUM({LISTS_PROYECTOS_SQL}) AS n_proyectos
                 FROM investigadores
                 WHERE activo = 1
                   AND nombre_completo <> ''
                   AND TRIM(COALESCE(area, '')) <> ''
                 GROUP BY TRIM(area) COLLATE NOCASE
                 ORDER BY n_investigadores DESC, n_proyectos DESC, nombre COLLATE NOCASE ASC
                 LIMIT ?1;"
            ),
            [limit],
            |row| {
                Ok(AreaPopular {
                    nombre: row.get("nombre")?,
                    investigadores: row.get("n_investigadores")?,
                    proyectos: row.get("n_proyectos")?,
                })
            },
        )
    }

    fn instituciones_destacadas(&self, limit: u32) -> RepoResult<Vec<InstitucionDestacada>> {
        let items = self.collect(
            "SELECT i.id,
                    i.nombre,
                    COUNT(v.id) AS n_investigadores,
                    SUM(CASE WHEN TRIM(COALESCE(v.proyectos_investigacion, '')) <> ''
                             THEN 1 ELSE 0 END) AS n_proyectos
             FROM instituciones i
             JOIN investigadores v
               ON TRIM(v.institucion) = TRIM(i.nombre) COLLATE NOCASE
              AND v.activo = 1
              AND v.nombre_completo <> ''
             WHERE i.activo = 1
             GROUP BY i.id
             ORDER BY n_investigadores DESC, n_proyectos DESC, i.nombre COLLATE NOCASE ASC, i.id ASC
             LIMIT ?1;",
            [limit],
            parse_destacada,
        )?;
        self.with_areas(items)
    }

    fn afiliaciones_destacadas(&self, limit: u32) -> RepoResult<Vec<InstitucionDestacada>> {
        let items = self.collect(
            &format!(
                "SELECT NULL AS id,
                        MIN(TRIM(institucion)) AS nombre,
                        COUNT(*) AS n_investigadores,
                        SUM({LISTS_PROYECTOS_SQL}) AS n_proyectos
                 FROM investigadores
                 WHERE activo = 1
                   AND nombre_completo <> ''
                   AND TRIM(COALESCE(institucion, '')) <> ''
                 GROUP BY TRIM(institucion) COLLATE NOCASE
                 ORDER BY n_investigadores DESC, n_proyectos DESC, nombre COLLATE NOCASE ASC
                 LIMIT ?1;"
            ),
            [limit],
            parse_destacada,
        )?;
        self.with_areas(items)
    }

    fn campos(&self) -> RepoResult<Vec<CampoResumen>> {
        self.collect(
            &format!(
                "SELECT MIN(TRIM(area)) AS nombre,
                        COUNT(*) AS n_investigadores,
                        COUNT(DISTINCT LOWER(NULLIF(TRIM(institucion), ''))) AS n_instituciones,
                        SUM({LISTS_PROYECTOS_SQL}) AS n_proyectos,
                        SUM({LISTS_ARTICULOS_SQL}) AS n_publicaciones
                 FROM investigadores
                 WHERE activo = 1
                   AND TRIM(COALESCE(area, '')) <> ''
                 GROUP BY TRIM(area) COLLATE NOCASE
                 ORDER BY nombre COLLATE NOCASE ASC;"
            ),
            [],
            |row| {
                let nombre: String = row.get("nombre")?;
                Ok(CampoResumen {
                    slug: generate_slug(&nombre),
                    nombre,
                    investigadores: row.get("n_investigadores")?,
                    instituciones: row.get("n_instituciones")?,
                    proyectos: row.get("n_proyectos")?,
                    publicaciones: row.get("n_publicaciones")?,
                })
            },
        )
    }

    fn miembros(&self, campo: &str, limit: u32) -> RepoResult<Vec<Investigador>> {
        self.collect(
            &format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE activo = 1 AND TRIM(area) = TRIM(?1) COLLATE NOCASE
                 ORDER BY nombre_completo COLLATE NOCASE ASC, id ASC
                 LIMIT ?2;"
            ),
            params![campo, limit],
            parse_investigador_row,
        )
    }

    fn lineas(&self, campo: &str, limit: u32) -> RepoResult<Vec<String>> {
        self.collect(
            "SELECT MIN(TRIM(linea_investigacion))
             FROM investigadores
             WHERE activo = 1
               AND TRIM(area) = TRIM(?1) COLLATE NOCASE
               AND TRIM(COALESCE(linea_investigacion, '')) <> ''
             GROUP BY TRIM(linea_investigacion) COLLATE NOCASE
             ORDER BY COUNT(*) DESC, MIN(TRIM(linea_investigacion)) COLLATE NOCASE ASC
             LIMIT ?2;",
            params![campo, limit],
            |row| Ok(row.get(0)?),
        )
    }

    fn proyectos(&self, campo: &str, limit: u32) -> RepoResult<Vec<Proyecto>> {
        self.collect(
            &format!(
                "{PROYECTO_SELECT_SQL}
                 WHERE creado_por IN (
                     SELECT id FROM investigadores
                     WHERE activo = 1 AND TRIM(area) = TRIM(?1) COLLATE NOCASE
                 )
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2;"
            ),
            params![campo, limit],
            parse_proyecto_row,
        )
    }

    fn instituciones(&self, campo: &str, limit: u32) -> RepoResult<Vec<Institucion>> {
        self.collect(
            &format!(
                "SELECT {INSTITUCION_COLUMNS_SQL}
                 FROM instituciones i
                 WHERE i.activo = 1
                   AND EXISTS (
                       SELECT 1 FROM investigadores v
                       WHERE v.activo = 1
                         AND TRIM(v.area) = TRIM(?1) COLLATE NOCASE
                         AND TRIM(v.institucion) = TRIM(i.nombre) COLLATE NOCASE
                   )
                 ORDER BY i.nombre COLLATE NOCASE ASC, i.id ASC
                 LIMIT ?2;"
            ),
            params![campo, limit],
            parse_institucion_row,
        )
    }
}

fn parse_destacada(row: &Row<'_>) -> RepoResult<InstitucionDestacada> {
    Ok(InstitucionDestacada {
        id: row.get("id")?,
        nombre: row.get("nombre")?,
        investigadores: row.get("n_investigadores")?,
        proyectos: row.get("n_proyectos")?,
        areas: Vec::new(),
    })
}
