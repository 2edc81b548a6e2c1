//! Directory-wide counters for the landing page and admin dashboard.

use crate::repo::convocatoria_repo::{ConvocatoriaRepository, SqliteConvocatoriaRepository};
use crate::repo::institucion_repo::{InstitucionRepository, SqliteInstitucionRepository};
use crate::repo::investigador_repo::{InvestigadorRepository, SqliteInvestigadorRepository};
use crate::repo::proyecto_repo::{ProyectoRepository, SqliteProyectoRepository};
use crate::repo::publicacion_repo::{PublicacionRepository, SqlitePublicacionRepository};
use crate::service::ServiceResult;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

/// Default window for "currently active" users.
pub const DEFAULT_VENTANA_MINUTOS: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Estadisticas {
    pub investigadores: i64,
    pub investigadores_activos: i64,
    pub instituciones: i64,
    pub proyectos: i64,
    pub publicaciones: i64,
    pub convocatorias_abiertas: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsuariosActivos {
    pub ventana_minutos: u32,
    pub activos: i64,
    pub total: i64,
}

/// Read-only aggregate queries over one connection.
pub struct EstadisticasService<'conn> {
    investigadores: SqliteInvestigadorRepository<'conn>,
    instituciones: SqliteInstitucionRepository<'conn>,
    proyectos: SqliteProyectoRepository<'conn>,
    publicaciones: SqlitePublicacionRepository<'conn>,
    convocatorias: SqliteConvocatoriaRepository<'conn>,
}

impl<'conn> EstadisticasService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> ServiceResult<Self> {
        Ok(Self {
            investigadores: SqliteInvestigadorRepository::try_new(conn)?,
            instituciones: SqliteInstitucionRepository::try_new(conn)?,
            proyectos: SqliteProyectoRepository::try_new(conn)?,
            publicaciones: SqlitePublicacionRepository::try_new(conn)?,
            convocatorias: SqliteConvocatoriaRepository::try_new(conn)?,
        })
    }

    pub fn totales(&self, hoy: NaiveDate) -> ServiceResult<Estadisticas> {
        Ok(Estadisticas {
            investigadores: self.investigadores.count(false)?,
            investigadores_activos: self.investigadores.count(true)?,
            instituciones: self.instituciones.count()?,
            proyectos: self.proyectos.count()?,
            publicaciones: self.publicaciones.count()?,
            convocatorias_abiertas: self.convocatorias.count_abiertas(hoy)?,
        })
    }

    /// Researchers with an authenticated request in the last
    /// `ventana_minutos` minutes.
    pub fn usuarios_activos(
        &self,
        ventana_minutos: u32,
        now_epoch_ms: i64,
    ) -> ServiceResult<UsuariosActivos> {
        let since = now_epoch_ms - i64::from(ventana_minutos) * 60_000;
        Ok(UsuariosActivos {
            ventana_minutos,
            activos: self.investigadores.count_activos_desde(since)?,
            total: self.investigadores.count(false)?,
        })
    }
}
