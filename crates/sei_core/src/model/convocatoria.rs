//! Funding call model.
//!
//! # Invariants
//! - `fecha_apertura <= fecha_cierre`.
//! - Status is never stored; it is derived from the dates on read.

use crate::model::proyecto::parse_date;
use crate::model::{clean, RowId, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Convocatoria {
    pub id: RowId,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub organizacion: Option<String>,
    pub categoria: Option<String>,
    pub fecha_apertura: NaiveDate,
    pub fecha_cierre: NaiveDate,
    pub monto: Option<String>,
    pub pdf_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Call status relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoConvocatoria {
    /// Opens in the future.
    Proxima,
    /// Between opening and closing, both inclusive.
    Abierta,
    /// Closing date has passed.
    Cerrada,
}

impl Convocatoria {
    pub fn estado(&self, hoy: NaiveDate) -> EstadoConvocatoria {
        if hoy < self.fecha_apertura {
            EstadoConvocatoria::Proxima
        } else if hoy <= self.fecha_cierre {
            EstadoConvocatoria::Abierta
        } else {
            EstadoConvocatoria::Cerrada
        }
    }

    /// Days until closing, `None` once closed.
    pub fn dias_restantes(&self, hoy: NaiveDate) -> Option<i64> {
        let days = (self.fecha_cierre - hoy).num_days();
        (days >= 0).then_some(days)
    }

    pub fn vista(self, hoy: NaiveDate) -> ConvocatoriaVista {
        ConvocatoriaVista {
            estado: self.estado(hoy),
            dias_restantes: self.dias_restantes(hoy),
            convocatoria: self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvocatoriaVista {
    #[serde(flatten)]
    pub convocatoria: Convocatoria,
    pub estado: EstadoConvocatoria,
    pub dias_restantes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConvocatoriaInput {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub organizacion: Option<String>,
    pub categoria: Option<String>,
    pub fecha_apertura: Option<String>,
    pub fecha_cierre: Option<String>,
    pub monto: Option<String>,
    pub pdf_url: Option<String>,
}

impl ConvocatoriaInput {
    pub fn normalize(&mut self) {
        for field in [
            &mut self.titulo,
            &mut self.descripcion,
            &mut self.organizacion,
            &mut self.categoria,
            &mut self.fecha_apertura,
            &mut self.fecha_cierre,
            &mut self.monto,
            &mut self.pdf_url,
        ] {
            clean(field);
        }
    }

    /// Validates and returns the parsed `(apertura, cierre)` dates.
    pub fn validate(&self) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        let missing = crate::model::missing_fields(&[
            ("titulo", &self.titulo),
            ("fecha_apertura", &self.fecha_apertura),
            ("fecha_cierre", &self.fecha_cierre),
        ]);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        let apertura = parse_date(
            "fecha_apertura",
            self.fecha_apertura.as_deref().unwrap_or(""),
        )?;
        let cierre = parse_date("fecha_cierre", self.fecha_cierre.as_deref().unwrap_or(""))?;
        if cierre < apertura {
            return Err(ValidationError::invalid(
                "fecha_cierre",
                "must not be earlier than fecha_apertura",
            ));
        }
        Ok((apertura, cierre))
    }
}

#[cfg(test)]
mod tests {
    use super::{Convocatoria, EstadoConvocatoria};
    use chrono::NaiveDate;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn convocatoria(apertura: &str, cierre: &str) -> Convocatoria {
        Convocatoria {
            id: 1,
            titulo: "Fondo estatal".to_string(),
            descripcion: None,
            organizacion: None,
            categoria: None,
            fecha_apertura: date(apertura),
            fecha_cierre: date(cierre),
            monto: None,
            pdf_url: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn estado_follows_date_window_inclusively() {
        let call = convocatoria("2025-03-01", "2025-03-31");
        assert_eq!(call.estado(date("2025-02-28")), EstadoConvocatoria::Proxima);
        assert_eq!(call.estado(date("2025-03-01")), EstadoConvocatoria::Abierta);
        assert_eq!(call.estado(date("2025-03-31")), EstadoConvocatoria::Abierta);
        assert_eq!(call.estado(date("2025-04-01")), EstadoConvocatoria::Cerrada);
    }

    #[test]
    fn dias_restantes_stops_after_closing() {
        let call = convocatoria("2025-03-01", "2025-03-31");
        assert_eq!(call.dias_restantes(date("2025-03-21")), Some(10));
        assert_eq!(call.dias_restantes(date("2025-03-31")), Some(0));
        assert_eq!(call.dias_restantes(date("2025-04-02")), None);
    }
}
