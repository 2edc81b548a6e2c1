//! Environment-driven server configuration.
//!
//! Every key has a default; an unparsable value logs a warning and falls
//! back to the default instead of aborting startup.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub log_dir: Option<String>,
    pub log_level: String,
    /// Shared secret for the cron endpoint; `None` leaves it open.
    pub cron_secret: Option<String>,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub session_ttl: Duration,
    pub pdftotext_bin: String,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session_ttl_hours: u64 = try_load(&lookup, "SEI_SESSION_TTL_HOURS", 24);
        Self {
            port: try_load(&lookup, "SEI_PORT", 3000),
            db_path: PathBuf::from(text(&lookup, "SEI_DB_PATH").unwrap_or_else(|| "sei.sqlite3".into())),
            upload_dir: PathBuf::from(text(&lookup, "SEI_UPLOAD_DIR").unwrap_or_else(|| "uploads".into())),
            log_dir: text(&lookup, "SEI_LOG_DIR"),
            log_level: text(&lookup, "SEI_LOG_LEVEL")
                .unwrap_or_else(|| sei_core::default_log_level().to_string()),
            cron_secret: text(&lookup, "CRON_SECRET"),
            allowed_origins: text(&lookup, "SEI_ALLOWED_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty() && *origin != "*")
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            session_ttl: Duration::from_secs(session_ttl_hours.max(1).saturating_mul(60 * 60)),
            pdftotext_bin: text(&lookup, "PDFTOTEXT_BIN").unwrap_or_else(|| "pdftotext".into()),
        }
    }
}

fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = text(lookup, key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.parse().unwrap_or_else(|err| {
        warn!("Invalid {key} value `{raw}`: {err}; using default: {default}");
        default
    })
}
