//! Publication model.

use crate::model::{clean, missing_fields, RowId, ValidationError};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

const MIN_PUBLICATION_YEAR: i32 = 1900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publicacion {
    pub id: RowId,
    pub titulo: String,
    pub autor: String,
    pub institucion: Option<String>,
    pub editorial: Option<String>,
    pub anio_creacion: Option<i32>,
    pub doi: Option<String>,
    pub resumen: Option<String>,
    pub palabras_clave: Option<String>,
    pub categoria: Option<String>,
    pub tipo: Option<String>,
    pub acceso: Option<String>,
    pub volumen: Option<String>,
    pub numero: Option<String>,
    pub paginas: Option<String>,
    pub archivo_url: Option<String>,
    pub creado_por: Option<RowId>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublicacionInput {
    pub titulo: Option<String>,
    pub autor: Option<String>,
    pub institucion: Option<String>,
    pub editorial: Option<String>,
    pub anio_creacion: Option<i32>,
    pub doi: Option<String>,
    pub resumen: Option<String>,
    pub palabras_clave: Option<String>,
    pub categoria: Option<String>,
    pub tipo: Option<String>,
    pub acceso: Option<String>,
    pub volumen: Option<String>,
    pub numero: Option<String>,
    pub paginas: Option<String>,
    pub archivo_url: Option<String>,
}

impl PublicacionInput {
    pub fn normalize(&mut self) {
        for field in [
            &mut self.titulo,
            &mut self.autor,
            &mut self.institucion,
            &mut self.editorial,
            &mut self.doi,
            &mut self.resumen,
            &mut self.palabras_clave,
            &mut self.categoria,
            &mut self.tipo,
            &mut self.acceso,
            &mut self.volumen,
            &mut self.numero,
            &mut self.paginas,
            &mut self.archivo_url,
        ] {
            clean(field);
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = missing_fields(&[("titulo", &self.titulo), ("autor", &self.autor)]);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if let Some(year) = self.anio_creacion {
            let max_year = chrono::Utc::now().year() + 1;
            if !(MIN_PUBLICATION_YEAR..=max_year).contains(&year) {
                return Err(ValidationError::invalid(
                    "anio_creacion",
                    format!("{year} is outside {MIN_PUBLICATION_YEAR}..={max_year}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PublicacionInput;
    use crate::model::ValidationError;

    #[test]
    fn validate_rejects_out_of_range_year() {
        let input = PublicacionInput {
            titulo: Some("Suelos".into()),
            autor: Some("Ruiz".into()),
            anio_creacion: Some(1850),
            ..PublicacionInput::default()
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidField {
                field: "anio_creacion",
                ..
            })
        ));
    }
}
