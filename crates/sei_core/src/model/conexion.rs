//! Researcher connection edge.
//!
//! # Invariants
//! - An edge is directed `origen -> destino` and never a self-loop.
//! - At most one edge exists per unordered researcher pair.
//! - Only `Pendiente` edges may transition, and only by the destination.

use crate::model::investigador::{ContactoResumen, Investigador};
use crate::model::RowId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoConexion {
    Pendiente,
    Aceptada,
    Rechazada,
}

impl EstadoConexion {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Aceptada => "aceptada",
            Self::Rechazada => "rechazada",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(Self::Pendiente),
            "aceptada" => Some(Self::Aceptada),
            "rechazada" => Some(Self::Rechazada),
            _ => None,
        }
    }
}

/// Answer given by the destination researcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccionConexion {
    Aceptar,
    Rechazar,
}

impl AccionConexion {
    pub fn estado_resultante(self) -> EstadoConexion {
        match self {
            Self::Aceptar => EstadoConexion::Aceptada,
            Self::Rechazar => EstadoConexion::Rechazada,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conexion {
    pub id: RowId,
    pub origen_id: RowId,
    pub destino_id: RowId,
    pub estado: EstadoConexion,
    pub mensaje: Option<String>,
    pub fecha_solicitud: i64,
    pub fecha_respuesta: Option<i64>,
}

/// Direction of an edge from the viewer's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoConexion {
    Enviada,
    Recibida,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConexionVista {
    #[serde(flatten)]
    pub conexion: Conexion,
    pub tipo: TipoConexion,
    pub otro: ContactoResumen,
}

/// Why a researcher is suggested as a new contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RazonSugerencia {
    AreaSimilar,
    MismaInstitucion,
}

/// Related researcher the viewer has no edge with yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sugerencia {
    #[serde(flatten)]
    pub contacto: ContactoResumen,
    pub area: Option<String>,
    pub linea_investigacion: Option<String>,
    pub razon: RazonSugerencia,
}

impl Sugerencia {
    pub fn new(perfil: &Investigador, candidato: Investigador) -> Self {
        let misma_area = match (perfil.area.as_deref(), candidato.area.as_deref()) {
            (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
            _ => false,
        };
        Self {
            razon: if misma_area {
                RazonSugerencia::AreaSimilar
            } else {
                RazonSugerencia::MismaInstitucion
            },
            area: candidato.area,
            linea_investigacion: candidato.linea_investigacion,
            contacto: ContactoResumen {
                id: candidato.id,
                slug: candidato.slug,
                nombre_completo: candidato.nombre_completo,
                correo: candidato.correo,
                fotografia_url: candidato.fotografia_url,
                institucion: candidato.institucion,
            },
        }
    }
}
