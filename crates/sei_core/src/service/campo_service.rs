//! Browsing the directory by research field.

use crate::model::campo::{
    AreaPopular, CampoDetalle, CampoQuery, InstitucionDestacada, PanoramaCampos,
};
use crate::repo::campo_repo::CampoRepository;
use crate::repo::normalize_limit;
use crate::service::{ServiceError, ServiceResult};
use log::debug;

pub const DEFAULT_AREAS_POPULARES: u32 = 6;
pub const DEFAULT_INSTITUCIONES_DESTACADAS: u32 = 4;
const MIEMBROS_POR_CAMPO: u32 = 20;
const LINEAS_POR_CAMPO: u32 = 8;
const PROYECTOS_POR_CAMPO: u32 = 10;
const INSTITUCIONES_POR_CAMPO: u32 = 10;

pub struct CampoService<R: CampoRepository> {
    repo: R,
}

impl<R: CampoRepository> CampoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn areas_populares(&self, limit: Option<u32>) -> ServiceResult<Vec<AreaPopular>> {
        let limit = normalize_limit(Some(limit.unwrap_or(DEFAULT_AREAS_POPULARES)));
        Ok(self.repo.areas_populares(limit)?)
    }

    /// Ranks catalogued institutions; falls back to free-text affiliations
    /// when none of them has researchers.
    pub fn instituciones_destacadas(
        &self,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<InstitucionDestacada>> {
        let limit = normalize_limit(Some(limit.unwrap_or(DEFAULT_INSTITUCIONES_DESTACADAS)));
        let catalogadas = self.repo.instituciones_destacadas(limit)?;
        if !catalogadas.is_empty() {
            return Ok(catalogadas);
        }
        debug!("event=instituciones_destacadas module=service status=fallback source=afiliaciones");
        Ok(self.repo.afiliaciones_destacadas(limit)?)
    }

    /// Fields with a usable slug, filtered and sorted by `query`.
    pub fn campos(&self, query: &CampoQuery) -> ServiceResult<PanoramaCampos> {
        let mut campos = self.repo.campos()?;
        campos.retain(|campo| !campo.slug.is_empty());
        query.apply(&mut campos);
        Ok(PanoramaCampos::new(campos))
    }

    /// Field whose name slugs to `slug`. Spellings that share a slug resolve
    /// to the one with the most researchers.
    pub fn campo(&self, slug: &str) -> ServiceResult<CampoDetalle> {
        let slug = slug.trim().to_lowercase();
        let resumen = self
            .repo
            .campos()?
            .into_iter()
            .filter(|campo| !slug.is_empty() && campo.slug == slug)
            .max_by(|a, b| {
                a.investigadores
                    .cmp(&b.investigadores)
                    .then_with(|| b.nombre.cmp(&a.nombre))
            })
            .ok_or_else(|| ServiceError::not_found("campo", &slug))?;

        let nombre = resumen.nombre.clone();
        Ok(CampoDetalle {
            lineas_investigacion: self.repo.lineas(&nombre, LINEAS_POR_CAMPO)?,
            miembros: self.repo.miembros(&nombre, MIEMBROS_POR_CAMPO)?,
            proyectos_recientes: self.repo.proyectos(&nombre, PROYECTOS_POR_CAMPO)?,
            instituciones_lista: self.repo.instituciones(&nombre, INSTITUCIONES_POR_CAMPO)?,
            resumen,
        })
    }
}
