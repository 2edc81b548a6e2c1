//! Regex scraping of identification and contact fields.
//!
//! # Invariants
//! - Input whitespace is collapsed to single spaces before matching.
//! - Every field is searched independently; for each field the labeled
//!   pattern (`CURP: ...`, `Tel: ...`) is tried before the bare one.
//! - The first acceptable match wins. There is no cross-field validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const NAME_WORD: &str = r"[A-ZÁÉÍÓÚÑ][a-záéíóúñ]+";
const MAX_FREE_TEXT_CHARS: usize = 120;

/// TLDs that may have trailing text glued to them (`gmail.comcelular`).
const GLUED_TLDS: &[&str] = &[
    "com", "mx", "edu", "org", "net", "gob", "gov", "es", "cl", "ar", "co", "br",
];
/// TLDs accepted at the end of an email address.
const VALID_TLDS: &[&str] = &[
    "com", "mx", "edu", "org", "net", "gob", "gov", "es", "cl", "ar", "co", "br", "uk", "us",
    "ca", "de", "fr", "it", "jp", "cn",
];
const TITLE_PREFIXES: &[&str] = &[
    "dra", "dr", "profesora", "profesor", "prof", "mtra", "mtro", "lic", "ing",
];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static CURP_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)CURP[:\s]*([A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d)").expect("valid regex"),
        Regex::new(r"\b([A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d)\b").expect("valid regex"),
    ]
});

static RFC_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)RFC[:\s]*([A-Z]{4}\d{6}[A-Z0-9]{3})\b").expect("valid regex"),
        Regex::new(r"\b([A-Z]{4}\d{6}[A-Z0-9]{3})\b").expect("valid regex"),
    ]
});

static CVU_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)(?:C\.V\.U\.|CVU)[:\s\-]*(\d{4,8})\b").expect("valid regex"),
        Regex::new(r"(?i)(?:número|numero|no\.?)\s*(?:de\s+)?(?:CVU|C\.V\.U\.)[:\s\-]*(\d{4,8})\b")
            .expect("valid regex"),
    ]
});

static EMAIL_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(
            r"(?i)(?:e-mail|email|correo(?:\s+electr[oó]nico)?|mail)[:\s]*([A-Z0-9._%+\-]+@[A-Z0-9.\-]+\.[A-Z]{2,})",
        )
        .expect("valid regex"),
        Regex::new(r"\b([A-Za-z0-9][A-Za-z0-9._%+\-]*@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})\b")
            .expect("valid regex"),
    ]
});
static EMAIL_SHAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.([a-z]+)$").expect("valid regex")
});

static PHONE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)(?:teléfono|telefono|tel|phone|celular|móvil|movil)\.?[:\s]*(?:\+?52)?[\s\-]?\d{10}\b")
            .expect("valid regex"),
        Regex::new(
            r"(?i)(?:teléfono|telefono|tel|phone)\.?[:\s]*(?:\+?52)?[\s\-]?\(?\d{3}\)?[\s\-]?\d{3}[\s\-]?\d{4}\b",
        )
        .expect("valid regex"),
        Regex::new(r"\b\d{10}\b").expect("valid regex"),
    ]
});

static NAME_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(&format!(
            r"\b(?i:Dra|Dr|Profesora|Profesor|Prof|Mtra|Mtro|Lic|Ing)\.?\s+({NAME_WORD}(?:\s+{NAME_WORD}){{1,4}})"
        ))
        .expect("valid regex"),
        Regex::new(&format!(
            r"\b(?i:Nombre|Name)[:\s]+({NAME_WORD}(?:\s+{NAME_WORD}){{1,4}})"
        ))
        .expect("valid regex"),
    ]
});

static BIRTH_DATE_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)(?:fecha\s+de\s+nacimiento|nacimiento|birth(?:\s*date)?)[:\s]*(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})")
            .expect("valid regex"),
        Regex::new(r"\b(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})\b").expect("valid regex"),
    ]
});

static INSTITUTION_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(
            r"(?i)\b((?:Universidad|Instituto|Centro|Facultad|Escuela)(?:\s+[\p{L}]+){0,3}?\s+(?:de|del|Autónoma|Autonoma|Nacional|Tecnológico|Tecnologico|Politécnico|Politecnico)(?:\s+[\p{L}]+){1,5})",
        )
        .expect("valid regex"),
        Regex::new(r"\b(UACH|UNAM|IPN|ITESM|UANL|UABC|UDG|UAM|CINVESTAV|CONACYT|CONAHCYT)\b")
            .expect("valid regex"),
    ]
});

static DEGREE_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(
            r"(?i)\b((?:Doctorado|PhD|Maestría|Maestria|Master|MSc|Licenciatura|Ingeniería|Ingenieria)\s+(?:en|de|del)(?:\s+[\p{L}]+){1,6})",
        )
        .expect("valid regex"),
        Regex::new(r"(?i)\b(?:Grado|Degree|Título|Titulo)[:\s]+([^,.;]+)").expect("valid regex"),
    ]
});

static JOB_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(
            r"\b((?:Profesor|Profesora|Investigador|Investigadora|Docente|Académico|Académica|Catedrático|Catedrática|Coordinador|Coordinadora|Director|Directora|Jefe|Jefa)(?:\s+[\p{L}]+){1,8})",
        )
        .expect("valid regex"),
        Regex::new(r"(?i)\b(?:Puesto|Position|Empleo)[:\s]+([^,.;]+)").expect("valid regex"),
    ]
});

/// Fields scraped from a CV. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub no_cvu: Option<String>,
    pub correo: Option<String>,
    pub telefono: Option<String>,
    pub nombre_completo: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub institucion: Option<String>,
    pub grado_maximo_estudios: Option<String>,
    pub experiencia_laboral: Option<String>,
}

impl ExtractedFields {
    /// Whether at least one of CURP, RFC or CVU was found.
    pub fn has_key_identifier(&self) -> bool {
        self.curp.is_some() || self.rfc.is_some() || self.no_cvu.is_some()
    }

    /// Names of the fields that were found, in declaration order.
    pub fn found_fields(&self) -> Vec<&'static str> {
        [
            ("curp", &self.curp),
            ("rfc", &self.rfc),
            ("no_cvu", &self.no_cvu),
            ("correo", &self.correo),
            ("telefono", &self.telefono),
            ("nombre_completo", &self.nombre_completo),
            ("fecha_nacimiento", &self.fecha_nacimiento),
            ("institucion", &self.institucion),
            ("grado_maximo_estudios", &self.grado_maximo_estudios),
            ("experiencia_laboral", &self.experiencia_laboral),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Scrapes every known field from `text`.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let clean = WHITESPACE_RE.replace_all(text, " ");
    let clean = clean.trim();

    ExtractedFields {
        curp: first_capture(CURP_PATTERNS.as_slice(), clean).map(|v| v.to_uppercase()),
        rfc: first_capture(RFC_PATTERNS.as_slice(), clean).map(|v| v.to_uppercase()),
        no_cvu: first_capture(CVU_PATTERNS.as_slice(), clean),
        correo: find_email(clean),
        telefono: find_phone(clean),
        nombre_completo: find_name(clean),
        fecha_nacimiento: first_capture(BIRTH_DATE_PATTERNS.as_slice(), clean),
        institucion: first_capture(INSTITUTION_PATTERNS.as_slice(), clean).map(trim_free_text),
        grado_maximo_estudios: first_capture(DEGREE_PATTERNS.as_slice(), clean)
            .map(trim_free_text),
        experiencia_laboral: first_capture(JOB_PATTERNS.as_slice(), clean).map(trim_free_text),
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn find_email(text: &str) -> Option<String> {
    EMAIL_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| clean_email(m.as_str()))
    })
}

/// Lowercases an address, strips words glued after the TLD and checks the
/// TLD against the accepted list.
pub(crate) fn clean_email(raw: &str) -> Option<String> {
    let mut email = raw.trim().to_lowercase();
    let dot = email.rfind('.')?;
    let tld = &email[dot + 1..];
    if !VALID_TLDS.contains(&tld) {
        let glued = GLUED_TLDS
            .iter()
            .filter(|candidate| tld.starts_with(**candidate))
            .max_by_key(|candidate| candidate.len())?;
        email.truncate(dot + 1 + glued.len());
    }

    let caps = EMAIL_SHAPE_RE.captures(&email)?;
    let tld = caps.get(1)?.as_str();
    VALID_TLDS.contains(&tld).then_some(email)
}

fn find_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .find_iter(text)
            .find_map(|m| normalize_phone(m.as_str()))
    })
}

/// Reduces a phone match to its 10 national digits.
pub(crate) fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 10 && digits.starts_with("52") {
        digits.drain(..2);
    }
    if digits.len() != 10 {
        return None;
    }
    if digits.chars().all(|ch| ch == '0') || digits.chars().all(|ch| ch == '1') {
        return None;
    }
    Some(digits)
}

fn find_name(text: &str) -> Option<String> {
    NAME_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| accept_name(m.as_str()))
    })
}

fn accept_name(raw: &str) -> Option<String> {
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    if let Some(first) = words.first() {
        let bare = first.trim_end_matches('.').to_lowercase();
        if TITLE_PREFIXES.contains(&bare.as_str()) {
            words.remove(0);
        }
    }
    let valid = (2..=5).contains(&words.len()) && words.iter().all(|w| w.chars().count() >= 2);
    valid.then(|| words.join(" "))
}

fn trim_free_text(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() <= MAX_FREE_TEXT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_FREE_TEXT_CHARS).collect();
    match cut.rfind(' ') {
        Some(space) => cut[..space].to_string(),
        None => cut,
    }
}
