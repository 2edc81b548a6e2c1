//! Researcher connection requests.
//!
//! # Invariants
//! - Requests target an existing researcher other than the caller.
//! - Only the destination answers, and only while the request is pending.

use crate::model::conexion::{
    AccionConexion, Conexion, ConexionVista, EstadoConexion, Sugerencia,
};
use crate::model::RowId;
use crate::repo::conexion_repo::ConexionRepository;
use crate::repo::investigador_repo::InvestigadorRepository;
use crate::repo::normalize_limit;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use std::collections::HashSet;

pub const DEFAULT_SUGERENCIAS: u32 = 6;
/// Related profiles scanned before existing contacts are filtered out.
const CANDIDATOS_SUGERENCIA: u32 = 100;

pub struct ConexionService<C: ConexionRepository, I: InvestigadorRepository> {
    conexiones: C,
    investigadores: I,
}

impl<C: ConexionRepository, I: InvestigadorRepository> ConexionService<C, I> {
    pub fn new(conexiones: C, investigadores: I) -> Self {
        Self {
            conexiones,
            investigadores,
        }
    }

    /// Opens a pending request `origen -> destino`.
    pub fn solicitar(
        &self,
        origen_id: RowId,
        destino_id: RowId,
        mensaje: Option<&str>,
    ) -> ServiceResult<Conexion> {
        if origen_id == destino_id {
            return Err(ServiceError::InvalidRequest(
                "cannot connect with yourself".to_string(),
            ));
        }
        if self.investigadores.get(destino_id)?.is_none() {
            return Err(ServiceError::not_found("investigador", destino_id));
        }

        let mensaje = mensaje.map(str::trim).filter(|value| !value.is_empty());
        let id = self.conexiones.solicitar(origen_id, destino_id, mensaje)?;
        info!(
            "event=conexion_solicitar module=service status=ok id={id} origen={origen_id} destino={destino_id}"
        );
        self.leer(id)
    }

    /// Accepts or rejects a pending request addressed to `investigador_id`.
    pub fn responder(
        &self,
        conexion_id: RowId,
        investigador_id: RowId,
        accion: AccionConexion,
    ) -> ServiceResult<Conexion> {
        let actual = self.leer(conexion_id)?;
        if actual.destino_id != investigador_id {
            return Err(ServiceError::Forbidden(
                "only the recipient may answer a connection request".to_string(),
            ));
        }
        if actual.estado != EstadoConexion::Pendiente {
            return Err(ServiceError::InvalidRequest(
                "connection request was already answered".to_string(),
            ));
        }

        let estado = accion.estado_resultante();
        if !self
            .conexiones
            .responder(conexion_id, investigador_id, estado)?
        {
            return Err(ServiceError::InvalidRequest(
                "connection request was already answered".to_string(),
            ));
        }
        info!(
            "event=conexion_responder module=service status=ok id={conexion_id} estado={}",
            estado.as_db()
        );
        self.leer(conexion_id)
    }

    pub fn listar(&self, investigador_id: RowId) -> ServiceResult<Vec<ConexionVista>> {
        Ok(self.conexiones.listar(investigador_id)?)
    }

    /// Number of pending requests waiting for `investigador_id`.
    pub fn pendientes(&self, investigador_id: RowId) -> ServiceResult<i64> {
        Ok(self.conexiones.count_pendientes_recibidas(investigador_id)?)
    }

    /// Edge between two researchers in either direction, if any.
    pub fn estado_con(&self, investigador_id: RowId, otro_id: RowId) -> ServiceResult<Option<Conexion>> {
        Ok(self.conexiones.entre(investigador_id, otro_id)?)
    }

    /// Related researchers (same area first, then same institution) with no
    /// edge to `investigador_id` in any state.
    pub fn sugerencias(
        &self,
        investigador_id: RowId,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Sugerencia>> {
        let perfil = self
            .investigadores
            .get(investigador_id)?
            .ok_or_else(|| ServiceError::not_found("investigador", investigador_id))?;
        let limit = normalize_limit(Some(limit.unwrap_or(DEFAULT_SUGERENCIAS))) as usize;

        let conocidos: HashSet<RowId> = self
            .conexiones
            .listar(investigador_id)?
            .into_iter()
            .map(|vista| vista.otro.id)
            .collect();
        let sugerencias: Vec<Sugerencia> = self
            .investigadores
            .relacionados(investigador_id, Some(CANDIDATOS_SUGERENCIA))?
            .into_iter()
            .filter(|candidato| !conocidos.contains(&candidato.id))
            .take(limit)
            .map(|candidato| Sugerencia::new(&perfil, candidato))
            .collect();
        info!(
            "event=conexion_sugerencias module=service status=ok id={investigador_id} count={}",
            sugerencias.len()
        );
        Ok(sugerencias)
    }

    fn leer(&self, id: RowId) -> ServiceResult<Conexion> {
        self.conexiones
            .get(id)?
            .ok_or_else(|| ServiceError::not_found("conexion", id))
    }
}
