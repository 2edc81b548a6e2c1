//! Direct message between researchers.

use crate::model::investigador::ContactoResumen;
use crate::model::{clean, missing_fields, RowId, ValidationError};
use serde::{Deserialize, Serialize};

pub const ASUNTO_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mensaje {
    pub id: RowId,
    pub remitente_id: RowId,
    pub destinatario_id: RowId,
    pub asunto: String,
    pub mensaje: String,
    pub fecha_envio: i64,
    pub leido: bool,
    pub mensaje_padre_id: Option<RowId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoMensaje {
    Enviado,
    Recibido,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MensajeVista {
    #[serde(flatten)]
    pub mensaje: Mensaje,
    pub tipo: TipoMensaje,
    pub otro: ContactoResumen,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NuevoMensaje {
    pub destinatario_id: Option<RowId>,
    pub asunto: Option<String>,
    pub mensaje: Option<String>,
    pub mensaje_padre_id: Option<RowId>,
}

impl NuevoMensaje {
    pub fn normalize(&mut self) {
        clean(&mut self.asunto);
        clean(&mut self.mensaje);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = missing_fields(&[("asunto", &self.asunto), ("mensaje", &self.mensaje)]);
        if self.destinatario_id.is_none() {
            missing.insert(0, "destinatario_id");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        let asunto_chars = self.asunto.as_deref().map_or(0, |a| a.chars().count());
        if asunto_chars > ASUNTO_MAX_CHARS {
            return Err(ValidationError::invalid(
                "asunto",
                format!("must be at most {ASUNTO_MAX_CHARS} characters"),
            ));
        }
        Ok(())
    }
}
