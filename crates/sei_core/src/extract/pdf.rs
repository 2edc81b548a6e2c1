//! PDF text extraction through Poppler's `pdftotext`.
//!
//! The upload is spooled to a temporary file because `pdftotext` needs a
//! seekable input. Output is read from stdout while the child runs so a large
//! document cannot fill the pipe and stall the process.

use crate::extract::{ExtractError, ExtractResult};
use log::{info, warn};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_STDERR_CHARS: usize = 300;

/// Text of a PDF plus its page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    pub text: String,
    pub pages: usize,
}

/// Extracts embedded text from `bytes` by running `bin -layout <file> -`.
///
/// # Errors
/// - `ToolUnavailable` when `bin` cannot be spawned.
/// - `ToolFailed` on a non-zero exit (encrypted or malformed PDF).
/// - `Timeout` when the tool runs longer than `timeout`; the child is killed.
pub fn extract_pdf_text(bytes: &[u8], bin: &str, timeout: Duration) -> ExtractResult<PdfText> {
    let started = Instant::now();
    let mut spool = tempfile::Builder::new()
        .prefix("sei-upload-")
        .suffix(".pdf")
        .tempfile()?;
    spool.write_all(bytes)?;
    spool.flush()?;

    let mut child = Command::new(bin)
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(spool.path())
        .arg("-")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| ExtractError::ToolUnavailable {
            bin: bin.to_string(),
            message: err.to_string(),
        })?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match wait_with_deadline(&mut child, started + timeout)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            warn!(
                "event=pdf_extract module=extract status=timeout bytes={} timeout_s={}",
                bytes.len(),
                timeout.as_secs()
            );
            return Err(ExtractError::Timeout(timeout));
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        warn!(
            "event=pdf_extract module=extract status=error exit={} bytes={}",
            status,
            bytes.len()
        );
        return Err(ExtractError::ToolFailed {
            status: status.to_string(),
            stderr: crate::logging::sanitize_message(stderr.trim(), MAX_STDERR_CHARS),
        });
    }

    let text = String::from_utf8_lossy(&stdout).into_owned();
    let pages = count_pages(&text);
    info!(
        "event=pdf_extract module=extract status=ok bytes={} pages={} text_chars={} duration_ms={}",
        bytes.len(),
        pages,
        text.chars().count(),
        started.elapsed().as_millis()
    );
    Ok(PdfText { text, pages })
}

fn spawn_reader<R>(source: Option<R>) -> thread::JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> ExtractResult<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Counts form-feed separated pages that carry text.
fn count_pages(text: &str) -> usize {
    text.split('\u{c}')
        .filter(|page| !page.trim().is_empty())
        .count()
}
