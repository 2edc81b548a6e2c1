//! Identification-field extraction from uploaded CV documents.
//!
//! # Responsibility
//! - Turn an uploaded PDF into plain text through the external `pdftotext`
//!   tool.
//! - Scrape identity and contact fields from that text with independent
//!   regular expressions.
//!
//! # Invariants
//! - Extraction never fails because a field is missing; absent fields are
//!   `None`.
//! - Only embedded text is read; scanned images yield `InsufficientText`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod fields;
pub mod pdf;

pub use fields::{extract_fields, ExtractedFields};
pub use pdf::{extract_pdf_text, PdfText};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Minimum non-whitespace characters for text to be worth scraping.
pub const MIN_TEXT_CHARS: usize = 20;
/// Wall-clock limit for the external text extractor.
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(55);

pub type ExtractResult<T> = Result<T, ExtractError>;

#[derive(Debug)]
pub enum ExtractError {
    /// Upload content type is not a PDF.
    UnsupportedContentType(String),
    TooLarge {
        size: usize,
        max: usize,
    },
    EmptyUpload,
    /// The document carries too little embedded text (likely a scan).
    InsufficientText {
        chars: usize,
    },
    /// The extractor binary could not be started.
    ToolUnavailable {
        bin: String,
        message: String,
    },
    /// The extractor exited with a failure status.
    ToolFailed {
        status: String,
        stderr: String,
    },
    Timeout(Duration),
    Io(std::io::Error),
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedContentType(content_type) => {
                write!(f, "only PDF files are accepted, got `{content_type}`")
            }
            Self::TooLarge { size, max } => {
                write!(f, "file of {size} bytes exceeds the {max} byte limit")
            }
            Self::EmptyUpload => write!(f, "no file was uploaded"),
            Self::InsufficientText { chars } => write!(
                f,
                "the PDF has too little extractable text ({chars} characters); it may be a scanned image"
            ),
            Self::ToolUnavailable { bin, message } => {
                write!(f, "cannot start `{bin}`: {message}")
            }
            Self::ToolFailed { status, stderr } => {
                write!(f, "text extraction failed ({status}): {stderr}")
            }
            Self::Timeout(limit) => {
                write!(f, "text extraction exceeded {} seconds", limit.as_secs())
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExtractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl ExtractError {
    /// Whether the failure came from the extraction tool rather than the
    /// caller's upload.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::ToolUnavailable { .. } | Self::ToolFailed { .. } | Self::Timeout(_) | Self::Io(_)
        )
    }
}

/// Checks upload metadata before any bytes are processed.
pub fn validate_upload(content_type: Option<&str>, size: usize) -> ExtractResult<()> {
    if size == 0 {
        return Err(ExtractError::EmptyUpload);
    }
    let content_type = content_type.unwrap_or_default();
    if !content_type.to_ascii_lowercase().contains("pdf") {
        return Err(ExtractError::UnsupportedContentType(content_type.to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ExtractError::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Rejects text that is too short to scrape.
pub fn ensure_sufficient_text(text: &str) -> ExtractResult<()> {
    let chars = text.chars().filter(|ch| !ch.is_whitespace()).count();
    if chars < MIN_TEXT_CHARS {
        return Err(ExtractError::InsufficientText { chars });
    }
    Ok(())
}
