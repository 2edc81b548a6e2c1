//! Institution model.
//!
//! Researchers reference institutions by name only; the directory counts
//! affiliated researchers with a case-insensitive name comparison.

use crate::model::{clean, RowId, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Institucion {
    pub id: RowId,
    pub nombre: String,
    pub siglas: Option<String>,
    pub tipo: Option<String>,
    pub descripcion: Option<String>,
    pub ubicacion: Option<String>,
    pub sitio_web: Option<String>,
    pub imagen_url: Option<String>,
    pub activo: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Institution row plus the number of researchers whose affiliation matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitucionConConteo {
    #[serde(flatten)]
    pub institucion: Institucion,
    pub investigadores: i64,
}

/// Create/replace input for an institution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstitucionInput {
    pub nombre: Option<String>,
    pub siglas: Option<String>,
    pub tipo: Option<String>,
    pub descripcion: Option<String>,
    pub ubicacion: Option<String>,
    pub sitio_web: Option<String>,
}

impl InstitucionInput {
    pub fn normalize(&mut self) {
        for field in [
            &mut self.nombre,
            &mut self.siglas,
            &mut self.tipo,
            &mut self.descripcion,
            &mut self.ubicacion,
            &mut self.sitio_web,
        ] {
            clean(field);
        }
        if let Some(siglas) = self.siglas.as_mut() {
            *siglas = siglas.to_uppercase();
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nombre.is_none() {
            return Err(ValidationError::MissingFields(vec!["nombre"]));
        }
        if let Some(url) = self.sitio_web.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::invalid(
                    "sitio_web",
                    "must start with http:// or https://",
                ));
            }
        }
        Ok(())
    }
}
