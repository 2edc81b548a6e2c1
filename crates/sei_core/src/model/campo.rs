//! Research-field aggregates.
//!
//! A field is the trimmed `area` declared on active researcher profiles,
//! grouped ignoring ASCII case. Project and publication counts here are
//! profile-based: they count members whose profile lists projects or
//! articles.

use crate::model::institucion::Institucion;
use crate::model::investigador::Investigador;
use crate::model::proyecto::Proyecto;
use crate::model::RowId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaPopular {
    pub nombre: String,
    pub investigadores: i64,
    pub proyectos: i64,
}

/// Institution ranked by affiliated active researchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitucionDestacada {
    /// `None` when the name only exists as a free-text affiliation.
    pub id: Option<RowId>,
    pub nombre: String,
    pub investigadores: i64,
    pub proyectos: i64,
    /// Most common fields among its researchers, at most five.
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampoResumen {
    pub slug: String,
    pub nombre: String,
    pub investigadores: i64,
    pub instituciones: i64,
    pub proyectos: i64,
    pub publicaciones: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TotalesCampos {
    pub total_campos: usize,
    pub total_investigadores: i64,
    pub total_proyectos: i64,
    pub total_publicaciones: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanoramaCampos {
    pub campos: Vec<CampoResumen>,
    pub estadisticas: TotalesCampos,
}

impl PanoramaCampos {
    pub fn new(campos: Vec<CampoResumen>) -> Self {
        let estadisticas = TotalesCampos {
            total_campos: campos.len(),
            total_investigadores: campos.iter().map(|campo| campo.investigadores).sum(),
            total_proyectos: campos.iter().map(|campo| campo.proyectos).sum(),
            total_publicaciones: campos.iter().map(|campo| campo.publicaciones).sum(),
        };
        Self {
            campos,
            estadisticas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampoDetalle {
    #[serde(flatten)]
    pub resumen: CampoResumen,
    pub lineas_investigacion: Vec<String>,
    pub miembros: Vec<Investigador>,
    /// Projects created by members, newest first.
    pub proyectos_recientes: Vec<Proyecto>,
    pub instituciones_lista: Vec<Institucion>,
}

/// Sort key for the field listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdenCampos {
    #[default]
    Investigadores,
    Proyectos,
    Publicaciones,
    Instituciones,
    Nombre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direccion {
    Asc,
    #[default]
    Desc,
}

/// Filters for the field listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CampoQuery {
    /// Case-insensitive substring of the field name.
    pub search: Option<String>,
    pub orden: OrdenCampos,
    pub direccion: Direccion,
}

impl CampoQuery {
    /// Filters and sorts `campos` in place; ties fall back to the name.
    pub fn apply(&self, campos: &mut Vec<CampoResumen>) {
        if let Some(search) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            let needle = search.to_lowercase();
            campos.retain(|campo| campo.nombre.to_lowercase().contains(&needle));
        }

        campos.sort_by(|a, b| {
            let key = match self.orden {
                OrdenCampos::Investigadores => a.investigadores.cmp(&b.investigadores),
                OrdenCampos::Proyectos => a.proyectos.cmp(&b.proyectos),
                OrdenCampos::Publicaciones => a.publicaciones.cmp(&b.publicaciones),
                OrdenCampos::Instituciones => a.instituciones.cmp(&b.instituciones),
                OrdenCampos::Nombre => a.nombre.to_lowercase().cmp(&b.nombre.to_lowercase()),
            };
            let key = match self.direccion {
                Direccion::Asc => key,
                Direccion::Desc => key.reverse(),
            };
            key.then_with(|| a.nombre.to_lowercase().cmp(&b.nombre.to_lowercase()))
        });
    }
}
