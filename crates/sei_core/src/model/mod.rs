//! Directory domain model.
//!
//! # Responsibility
//! - Define the records persisted by the directory (researchers, institutions,
//!   projects, publications, calls, connections and messages).
//! - Validate write inputs before they reach repositories.
//!
//! # Invariants
//! - Row identifiers are SQLite integer keys and never reused.
//! - Institution affiliation is a free-text name, matched case-insensitively.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod campo;
pub mod conexion;
pub mod convocatoria;
pub mod institucion;
pub mod investigador;
pub mod mensaje;
pub mod proyecto;
pub mod publicacion;

/// Integer row identifier shared by every directory table.
pub type RowId = i64;

/// Input validation failure raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are absent or blank.
    MissingFields(Vec<&'static str>),
    /// A field is present but malformed.
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => write!(f, "missing fields: {}", fields.join(", ")),
            Self::InvalidField { field, message } => write!(f, "invalid `{field}`: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Trims an optional text field in place and drops it when blank.
pub(crate) fn clean(value: &mut Option<String>) {
    if let Some(text) = value.take() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            *value = Some(trimmed.to_string());
        }
    }
}

/// Returns true when an optional text field is absent or blank.
pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |text| text.trim().is_empty())
}

/// Collects the names of blank required fields.
pub(crate) fn missing_fields(fields: &[(&'static str, &Option<String>)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{clean, missing_fields};

    #[test]
    fn clean_trims_and_drops_blank_values() {
        let mut value = Some("  UACH  ".to_string());
        clean(&mut value);
        assert_eq!(value.as_deref(), Some("UACH"));

        let mut blank = Some("   ".to_string());
        clean(&mut blank);
        assert!(blank.is_none());
    }

    #[test]
    fn missing_fields_keeps_declaration_order() {
        let titulo = Some("x".to_string());
        let autor = None;
        let resumen = Some(" ".to_string());
        let missing = missing_fields(&[
            ("titulo", &titulo),
            ("autor", &autor),
            ("resumen", &resumen),
        ]);
        assert_eq!(missing, vec!["autor", "resumen"]);
    }
}
