//! Researcher profile model.
//!
//! # Responsibility
//! - Define the canonical researcher row and its create/update inputs.
//! - Normalize identity fields (CURP/RFC uppercase, email lowercase).
//!
//! # Invariants
//! - `curp`, when present, matches the 18-character national identity pattern.
//! - `rfc`, when present, matches the 12/13-character tax-id pattern.
//! - A profile always carries at least one of name, CURP, RFC or CVU.
//! - Scientific production fields are newline-delimited free text.

use crate::model::{clean, RowId, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub(crate) static CURP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d$").expect("valid curp regex")
});
pub(crate) static RFC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z&Ñ]{3,4}\d{6}[A-Z0-9]{3}$").expect("valid rfc regex"));
pub(crate) static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// How a profile entered the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origen {
    /// Self-service registration form.
    #[default]
    Registro,
    /// Fields scraped from an uploaded CV PDF.
    Ocr,
    /// Created by an administrator.
    Admin,
}

impl Origen {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Registro => "registro",
            Self::Ocr => "ocr",
            Self::Admin => "admin",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "registro" => Some(Self::Registro),
            "ocr" => Some(Self::Ocr),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Persisted researcher profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Investigador {
    pub id: RowId,
    pub slug: Option<String>,
    pub nombre_completo: String,
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub no_cvu: Option<String>,
    pub orcid: Option<String>,
    pub correo: Option<String>,
    pub telefono: Option<String>,
    pub institucion: Option<String>,
    pub area: Option<String>,
    pub linea_investigacion: Option<String>,
    pub nivel: Option<String>,
    pub sni: Option<String>,
    pub grado_maximo_estudios: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub experiencia_laboral: Option<String>,
    pub proyectos_investigacion: Option<String>,
    pub articulos: Option<String>,
    pub libros: Option<String>,
    pub capitulos_libros: Option<String>,
    pub fotografia_url: Option<String>,
    pub cv_url: Option<String>,
    pub origen: Origen,
    pub es_admin: bool,
    pub es_evaluador: bool,
    pub activo: bool,
    /// Epoch milliseconds of the last authenticated request.
    pub ultima_actividad: Option<i64>,
    pub fecha_registro: i64,
    pub updated_at: i64,
}

/// Scientific production split into display lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Produccion {
    pub proyectos: Vec<String>,
    pub articulos: Vec<String>,
    pub libros: Vec<String>,
    pub capitulos: Vec<String>,
}

impl Investigador {
    /// Splits the newline-delimited production fields.
    pub fn produccion(&self) -> Produccion {
        Produccion {
            proyectos: split_lines(self.proyectos_investigacion.as_deref()),
            articulos: split_lines(self.articulos.as_deref()),
            libros: split_lines(self.libros.as_deref()),
            capitulos: split_lines(self.capitulos_libros.as_deref()),
        }
    }

    /// Names the key fields a complete profile must carry but this one lacks.
    pub fn campos_faltantes(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.nombre_completo.trim().is_empty() {
            missing.push("nombre_completo");
        }
        for (name, value) in [
            ("curp", &self.curp),
            ("rfc", &self.rfc),
            ("no_cvu", &self.no_cvu),
            ("correo", &self.correo),
            ("telefono", &self.telefono),
            ("institucion", &self.institucion),
        ] {
            if value.is_none() {
                missing.push(name);
            }
        }
        missing
    }

    /// Short public card used in connection/message listings.
    pub fn resumen(&self) -> ContactoResumen {
        ContactoResumen {
            id: self.id,
            slug: self.slug.clone(),
            nombre_completo: self.nombre_completo.clone(),
            correo: self.correo.clone(),
            fotografia_url: self.fotografia_url.clone(),
            institucion: self.institucion.clone(),
        }
    }
}

/// Public summary of the other party in social listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactoResumen {
    pub id: RowId,
    pub slug: Option<String>,
    pub nombre_completo: String,
    pub correo: Option<String>,
    pub fotografia_url: Option<String>,
    pub institucion: Option<String>,
}

/// Create input for a researcher profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NuevoInvestigador {
    pub nombre_completo: String,
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub no_cvu: Option<String>,
    pub orcid: Option<String>,
    pub correo: Option<String>,
    pub telefono: Option<String>,
    pub institucion: Option<String>,
    pub area: Option<String>,
    pub linea_investigacion: Option<String>,
    pub nivel: Option<String>,
    pub sni: Option<String>,
    pub grado_maximo_estudios: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub experiencia_laboral: Option<String>,
    pub proyectos_investigacion: Option<String>,
    pub articulos: Option<String>,
    pub libros: Option<String>,
    pub capitulos_libros: Option<String>,
    #[serde(skip)]
    pub origen: Origen,
}

impl NuevoInvestigador {
    /// Trims every field, drops blanks and normalizes identity casing.
    pub fn normalize(&mut self) {
        self.nombre_completo = self.nombre_completo.trim().to_string();
        for field in [
            &mut self.curp,
            &mut self.rfc,
            &mut self.no_cvu,
            &mut self.orcid,
            &mut self.correo,
            &mut self.telefono,
            &mut self.institucion,
            &mut self.area,
            &mut self.linea_investigacion,
            &mut self.nivel,
            &mut self.sni,
            &mut self.grado_maximo_estudios,
            &mut self.fecha_nacimiento,
            &mut self.experiencia_laboral,
            &mut self.proyectos_investigacion,
            &mut self.articulos,
            &mut self.libros,
            &mut self.capitulos_libros,
        ] {
            clean(field);
        }
        normalize_identity(&mut self.curp, &mut self.rfc, &mut self.correo);
    }

    /// Validates a normalized create input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nombre_completo.is_empty()
            && self.curp.is_none()
            && self.rfc.is_none()
            && self.no_cvu.is_none()
        {
            return Err(ValidationError::MissingFields(vec![
                "nombre_completo",
                "curp",
                "rfc",
                "no_cvu",
            ]));
        }
        validate_identity(
            self.curp.as_deref(),
            self.rfc.as_deref(),
            self.correo.as_deref(),
        )
    }
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvestigadorUpdate {
    pub nombre_completo: Option<String>,
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub no_cvu: Option<String>,
    pub orcid: Option<String>,
    pub correo: Option<String>,
    pub telefono: Option<String>,
    pub institucion: Option<String>,
    pub area: Option<String>,
    pub linea_investigacion: Option<String>,
    pub nivel: Option<String>,
    pub sni: Option<String>,
    pub grado_maximo_estudios: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub experiencia_laboral: Option<String>,
    pub proyectos_investigacion: Option<String>,
    pub articulos: Option<String>,
    pub libros: Option<String>,
    pub capitulos_libros: Option<String>,
}

impl InvestigadorUpdate {
    pub fn normalize(&mut self) {
        for field in [
            &mut self.nombre_completo,
            &mut self.curp,
            &mut self.rfc,
            &mut self.no_cvu,
            &mut self.orcid,
            &mut self.correo,
            &mut self.telefono,
            &mut self.institucion,
            &mut self.area,
            &mut self.linea_investigacion,
            &mut self.nivel,
            &mut self.sni,
            &mut self.grado_maximo_estudios,
            &mut self.fecha_nacimiento,
            &mut self.experiencia_laboral,
            &mut self.proyectos_investigacion,
            &mut self.articulos,
            &mut self.libros,
            &mut self.capitulos_libros,
        ] {
            clean(field);
        }
        normalize_identity(&mut self.curp, &mut self.rfc, &mut self.correo);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identity(
            self.curp.as_deref(),
            self.rfc.as_deref(),
            self.correo.as_deref(),
        )
    }

    /// Applies provided fields over an existing profile.
    pub fn apply_to(self, target: &mut Investigador) {
        if let Some(value) = self.nombre_completo {
            target.nombre_completo = value;
        }
        merge(&mut target.curp, self.curp);
        merge(&mut target.rfc, self.rfc);
        merge(&mut target.no_cvu, self.no_cvu);
        merge(&mut target.orcid, self.orcid);
        merge(&mut target.correo, self.correo);
        merge(&mut target.telefono, self.telefono);
        merge(&mut target.institucion, self.institucion);
        merge(&mut target.area, self.area);
        merge(&mut target.linea_investigacion, self.linea_investigacion);
        merge(&mut target.nivel, self.nivel);
        merge(&mut target.sni, self.sni);
        merge(&mut target.grado_maximo_estudios, self.grado_maximo_estudios);
        merge(&mut target.fecha_nacimiento, self.fecha_nacimiento);
        merge(&mut target.experiencia_laboral, self.experiencia_laboral);
        merge(
            &mut target.proyectos_investigacion,
            self.proyectos_investigacion,
        );
        merge(&mut target.articulos, self.articulos);
        merge(&mut target.libros, self.libros);
        merge(&mut target.capitulos_libros, self.capitulos_libros);
    }
}

fn merge(target: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *target = value;
    }
}

fn normalize_identity(
    curp: &mut Option<String>,
    rfc: &mut Option<String>,
    correo: &mut Option<String>,
) {
    if let Some(value) = curp.as_mut() {
        *value = value.to_uppercase();
    }
    if let Some(value) = rfc.as_mut() {
        *value = value.to_uppercase();
    }
    if let Some(value) = correo.as_mut() {
        *value = value.to_lowercase();
    }
}

fn validate_identity(
    curp: Option<&str>,
    rfc: Option<&str>,
    correo: Option<&str>,
) -> Result<(), ValidationError> {
    if let Some(value) = curp {
        if !CURP_RE.is_match(value) {
            return Err(ValidationError::invalid(
                "curp",
                format!("`{value}` is not an 18-character CURP"),
            ));
        }
    }
    if let Some(value) = rfc {
        if !RFC_RE.is_match(value) {
            return Err(ValidationError::invalid(
                "rfc",
                format!("`{value}` is not a valid RFC"),
            ));
        }
    }
    if let Some(value) = correo {
        if !EMAIL_RE.is_match(value) {
            return Err(ValidationError::invalid(
                "correo",
                format!("`{value}` is not an email address"),
            ));
        }
    }
    Ok(())
}

/// Splits newline-delimited text into trimmed, non-empty lines.
pub fn split_lines(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
