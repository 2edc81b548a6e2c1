//! Process-wide log setup and masking helpers for personal data.
//!
//! # Responsibility
//! - Start one `flexi_logger` backend per process, writing either rolling
//!   files or stderr.
//! - Keep CURP, RFC and email values out of log lines in clear text.
//!
//! # Invariants
//! - A second init with the same level and target is a no-op.
//! - A second init with a different level or target is an error.
//! - Nothing here panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_BASENAME: &str = "sei";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED: usize = 5;
const PANIC_MESSAGE_CHARS: usize = 160;
const VISIBLE_IDENTIFIER_CHARS: usize = 4;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Minimum severity written by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level `{other}` (use trace, debug, info, warn or error)"
            )),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Size-rotated `sei_*.log` files inside an absolute directory.
    Directory(PathBuf),
    Stderr,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

struct ActiveLogger {
    level: LogLevel,
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts file logging under `log_dir`, which must be absolute.
///
/// # Errors
/// Unknown level, a relative or blank directory, a directory that cannot be
/// created, or a conflict with the logger already running.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let dir = log_directory(log_dir)?;
    start(level.parse()?, LogTarget::Directory(dir))
}

/// Starts logging to stderr for foreground processes and the CLI.
pub fn init_stderr_logging(level: &str) -> Result<(), String> {
    start(level.parse()?, LogTarget::Stderr)
}

fn start(level: LogLevel, target: LogTarget) -> Result<(), String> {
    let active = ACTIVE.get_or_try_init(|| spawn_backend(level, target.clone()))?;
    ensure_compatible(active, level, &target)
}

fn spawn_backend(level: LogLevel, target: LogTarget) -> Result<ActiveLogger, String> {
    let logger = Logger::try_with_str(level.as_str())
        .map_err(|err| format!("cannot configure logger for `{level}`: {err}"))?;

    let handle = match &target {
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir.as_path()).basename(LOG_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format)
            .start(),
    }
    .map_err(|err| format!("cannot start logger: {err}"))?;

    install_panic_hook();
    info!(
        "event=logging_init module=core status=ok level={level} target={target} version={} os={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        level,
        target,
        _handle: handle,
    })
}

fn ensure_compatible(active: &ActiveLogger, level: LogLevel, target: &LogTarget) -> Result<(), String> {
    if active.target != *target {
        return Err(format!(
            "logger already writes to `{}`, cannot switch to `{target}`",
            active.target
        ));
    }
    if active.level != level {
        return Err(format!(
            "logger already runs at `{}`, cannot switch to `{level}`",
            active.level
        ));
    }
    Ok(())
}

/// Level and target of the running logger, if any.
pub fn logging_status() -> Option<(LogLevel, LogTarget)> {
    ACTIVE.get().map(|active| (active.level, active.target.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        LogLevel::Debug.as_str()
    } else {
        LogLevel::Info.as_str()
    }
}

fn log_directory(raw: &str) -> Result<PathBuf, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("log directory is blank".to_string());
    }
    let path = Path::new(raw);
    if !path.is_absolute() {
        return Err(format!("log directory `{raw}` is not an absolute path"));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string payload".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            sanitize_message(&payload, PANIC_MESSAGE_CHARS)
        );
        previous(panic);
    }));
}

/// Puts `value` on one line and cuts it to `max_chars` characters.
pub fn sanitize_message(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Keeps the first characters of a CURP, RFC or CVU and stars the rest.
pub fn mask_identifier(value: &str) -> String {
    value
        .chars()
        .enumerate()
        .map(|(index, ch)| if index < VISIBLE_IDENTIFIER_CHARS { ch } else { '*' })
        .collect()
}

/// Masks the local part of an address: `maria.lopez@uacj.mx` -> `m***@uacj.mx`.
pub fn mask_email(value: &str) -> String {
    match value.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => mask_identifier(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!(" warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_directory_must_be_absolute() {
        let err = log_directory("logs/dev").unwrap_err();
        assert!(err.contains("absolute"));
        assert!(log_directory("   ").is_err());
    }

    #[test]
    fn sanitize_message_flattens_and_truncates() {
        assert_eq!(sanitize_message("a\nb", 10), "a b");
        let cut = sanitize_message("line1\nline2\rline3", 8);
        assert_eq!(cut, "line1 li...");
    }

    #[test]
    fn personal_data_is_masked() {
        assert_eq!(mask_identifier("AESR850312HCHMNL02"), "AESR**************");
        assert_eq!(mask_identifier("123"), "123");
        assert_eq!(mask_email("maria.lopez@uacj.mx"), "m***@uacj.mx");
        assert_eq!(mask_email("sin-arroba"), "sin-******");
    }

    #[test]
    fn second_init_must_match_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap().to_string();
        let other = tempfile::tempdir().unwrap();
        let other_str = other.path().to_str().unwrap().to_string();

        init_logging("info", &dir_str).unwrap();
        init_logging("INFO", &dir_str).unwrap();

        assert!(init_logging("debug", &dir_str)
            .unwrap_err()
            .contains("cannot switch"));
        assert!(init_logging("info", &other_str)
            .unwrap_err()
            .contains("cannot switch"));
        assert!(init_stderr_logging("info").unwrap_err().contains("cannot switch"));

        let (level, target) = logging_status().unwrap();
        assert_eq!(level, LogLevel::Info);
        assert_eq!(target, LogTarget::Directory(dir.path().to_path_buf()));
    }
}
