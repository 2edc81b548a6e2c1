//! Researcher profile use-cases.
//!
//! # Responsibility
//! - Register profiles from the form, the admin console or scraped CV
//!   fields, refusing duplicate identities.
//! - Expose profile reads used by the public directory.
//!
//! # Invariants
//! - Duplicate checks run in order CURP, email, then full name (the latter
//!   only when no CURP is supplied).
//! - A profile scraped from a CV needs at least one of CURP, RFC or CVU.

use crate::extract::ExtractedFields;
use crate::logging::mask_identifier;
use crate::model::investigador::{Investigador, InvestigadorUpdate, NuevoInvestigador, Origen};
use crate::model::{RowId, ValidationError};
use crate::repo::investigador_repo::{ArchivoPerfil, InvestigadorListQuery, InvestigadorRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;

/// Researcher service facade over a repository implementation.
pub struct InvestigadorService<R: InvestigadorRepository> {
    repo: R,
}

impl<R: InvestigadorRepository> InvestigadorService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a profile after normalization and duplicate checks.
    ///
    /// The slug is assigned from the name and the new row id.
    pub fn registrar(&self, mut input: NuevoInvestigador) -> ServiceResult<Investigador> {
        input.normalize();
        input.validate()?;

        let nombre = Some(input.nombre_completo.as_str()).filter(|value| !value.is_empty());
        if let Some((key, existing_id)) = self.repo.find_duplicate(
            input.curp.as_deref(),
            input.correo.as_deref(),
            nombre,
            None,
        )? {
            info!(
                "event=investigador_registrar module=service status=duplicate field={} existing_id={}",
                key.field(),
                existing_id
            );
            return Err(ServiceError::Duplicate {
                field: key.field(),
                existing_id,
            });
        }

        let id = self.repo.create(&input)?;
        info!(
            "event=investigador_registrar module=service status=ok id={} origen={}",
            id,
            input.origen.as_db()
        );
        self.obtener(id)
    }

    /// Persists the identity fields scraped from an uploaded CV.
    pub fn guardar_desde_ocr(&self, fields: &ExtractedFields) -> ServiceResult<Investigador> {
        if !fields.has_key_identifier() {
            return Err(ServiceError::Validation(ValidationError::MissingFields(
                vec!["curp", "rfc", "no_cvu"],
            )));
        }

        let input = NuevoInvestigador {
            nombre_completo: fields.nombre_completo.clone().unwrap_or_default(),
            curp: fields.curp.clone(),
            rfc: fields.rfc.clone(),
            no_cvu: fields.no_cvu.clone(),
            correo: fields.correo.clone(),
            telefono: fields.telefono.clone(),
            institucion: fields.institucion.clone(),
            grado_maximo_estudios: fields.grado_maximo_estudios.clone(),
            fecha_nacimiento: fields.fecha_nacimiento.clone(),
            experiencia_laboral: fields.experiencia_laboral.clone(),
            origen: Origen::Ocr,
            ..NuevoInvestigador::default()
        };
        info!(
            "event=investigador_ocr module=service status=start curp={} rfc={} campos={}",
            fields.curp.as_deref().map(mask_identifier).unwrap_or_default(),
            fields.rfc.as_deref().map(mask_identifier).unwrap_or_default(),
            fields.found_fields().len()
        );
        self.registrar(input)
    }

    /// Applies a partial update; identity keys may not collide with another
    /// profile.
    pub fn actualizar(
        &self,
        id: RowId,
        mut update: InvestigadorUpdate,
    ) -> ServiceResult<Investigador> {
        update.normalize();
        update.validate()?;

        if update.curp.is_some() || update.correo.is_some() {
            if let Some((key, existing_id)) = self.repo.find_duplicate(
                update.curp.as_deref(),
                update.correo.as_deref(),
                None,
                Some(id),
            )? {
                return Err(ServiceError::Duplicate {
                    field: key.field(),
                    existing_id,
                });
            }
        }

        Ok(self.repo.update(id, update)?)
    }

    pub fn obtener(&self, id: RowId) -> ServiceResult<Investigador> {
        self.repo
            .get(id)?
            .ok_or_else(|| ServiceError::not_found("investigador", id))
    }

    pub fn perfil_por_slug(&self, slug: &str) -> ServiceResult<Investigador> {
        self.repo
            .get_by_slug(slug.trim())?
            .ok_or_else(|| ServiceError::not_found("investigador", slug))
    }

    pub fn listar(&self, query: &InvestigadorListQuery) -> ServiceResult<Vec<Investigador>> {
        Ok(self.repo.list(query)?)
    }

    pub fn eliminar(&self, id: RowId) -> ServiceResult<()> {
        self.repo.delete(id)?;
        info!("event=investigador_eliminar module=service status=ok id={id}");
        Ok(())
    }

    pub fn activar(&self, id: RowId) -> ServiceResult<Investigador> {
        self.repo.set_activo(id, true)?;
        self.obtener(id)
    }

    pub fn desactivar(&self, id: RowId) -> ServiceResult<Investigador> {
        self.repo.set_activo(id, false)?;
        self.obtener(id)
    }

    pub fn asignar_roles(
        &self,
        id: RowId,
        es_admin: bool,
        es_evaluador: bool,
    ) -> ServiceResult<Investigador> {
        self.repo.set_roles(id, es_admin, es_evaluador)?;
        info!(
            "event=investigador_roles module=service status=ok id={id} es_admin={es_admin} es_evaluador={es_evaluador}"
        );
        self.obtener(id)
    }

    /// Links an uploaded file URL to the profile.
    pub fn vincular_archivo(
        &self,
        id: RowId,
        archivo: ArchivoPerfil,
        url: &str,
    ) -> ServiceResult<Investigador> {
        self.repo.set_archivo(id, archivo, url)?;
        self.obtener(id)
    }

    pub fn registrar_actividad(&self, id: RowId, at_epoch_ms: i64) -> ServiceResult<()> {
        Ok(self.repo.touch_actividad(id, at_epoch_ms)?)
    }

    /// Profiles sharing area or institution with the one at `slug`.
    pub fn relacionados(&self, slug: &str, limit: Option<u32>) -> ServiceResult<Vec<Investigador>> {
        let perfil = self.perfil_por_slug(slug)?;
        Ok(self.repo.relacionados(perfil.id, limit)?)
    }

    pub fn featured(&self, limit: Option<u32>) -> ServiceResult<Vec<Investigador>> {
        Ok(self.repo.featured(limit)?)
    }

    pub fn incompletos(&self, limit: Option<u32>) -> ServiceResult<Vec<Investigador>> {
        Ok(self.repo.list_incompletos(limit)?)
    }

    pub fn evaluadores(&self) -> ServiceResult<Vec<Investigador>> {
        Ok(self.repo.list_evaluadores()?)
    }
}
