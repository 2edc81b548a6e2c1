//! Research project model.
//!
//! # Invariants
//! - Every descriptive field in [`ProyectoInput::REQUIRED`] is present.
//! - `fecha_inicio`/`fecha_fin` are `YYYY-MM-DD`; the end is not before the start.

use crate::model::{clean, missing_fields, RowId, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proyecto {
    pub id: RowId,
    pub slug: Option<String>,
    pub titulo: String,
    pub descripcion: String,
    pub resumen: String,
    pub categoria: String,
    pub autor: String,
    pub institucion: String,
    pub fecha_inicio: String,
    pub fecha_fin: Option<String>,
    pub estado: Option<String>,
    pub palabras_clave: Option<String>,
    pub creado_por: Option<RowId>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProyectoInput {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub resumen: Option<String>,
    pub categoria: Option<String>,
    pub autor: Option<String>,
    pub institucion: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub estado: Option<String>,
    pub palabras_clave: Option<String>,
}

impl ProyectoInput {
    pub const REQUIRED: [&'static str; 7] = [
        "titulo",
        "descripcion",
        "resumen",
        "categoria",
        "autor",
        "institucion",
        "fechaInicio",
    ];

    pub fn normalize(&mut self) {
        for field in [
            &mut self.titulo,
            &mut self.descripcion,
            &mut self.resumen,
            &mut self.categoria,
            &mut self.autor,
            &mut self.institucion,
            &mut self.fecha_inicio,
            &mut self.fecha_fin,
            &mut self.estado,
            &mut self.palabras_clave,
        ] {
            clean(field);
        }
    }

    /// Reports every missing required field at once, then checks dates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = missing_fields(&[
            (Self::REQUIRED[0], &self.titulo),
            (Self::REQUIRED[1], &self.descripcion),
            (Self::REQUIRED[2], &self.resumen),
            (Self::REQUIRED[3], &self.categoria),
            (Self::REQUIRED[4], &self.autor),
            (Self::REQUIRED[5], &self.institucion),
            (Self::REQUIRED[6], &self.fecha_inicio),
        ]);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let inicio = parse_date("fechaInicio", self.fecha_inicio.as_deref().unwrap_or(""))?;
        if let Some(fin) = self.fecha_fin.as_deref() {
            let fin = parse_date("fechaFin", fin)?;
            if fin < inicio {
                return Err(ValidationError::invalid(
                    "fechaFin",
                    "must not be earlier than fechaInicio",
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid(field, format!("`{value}` is not YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::ProyectoInput;
    use crate::model::ValidationError;

    #[test]
    fn validate_lists_all_missing_fields() {
        let input = ProyectoInput {
            titulo: Some("Agua".to_string()),
            ..ProyectoInput::default()
        };
        match input.validate() {
            Err(ValidationError::MissingFields(fields)) => {
                assert_eq!(fields.len(), 6);
                assert!(fields.contains(&"fechaInicio"));
                assert!(!fields.contains(&"titulo"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_end_before_start() {
        let input = ProyectoInput {
            titulo: Some("t".into()),
            descripcion: Some("d".into()),
            resumen: Some("r".into()),
            categoria: Some("c".into()),
            autor: Some("a".into()),
            institucion: Some("i".into()),
            fecha_inicio: Some("2024-05-01".into()),
            fecha_fin: Some("2024-04-01".into()),
            ..ProyectoInput::default()
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidField { field: "fechaFin", .. })
        ));
    }
}
