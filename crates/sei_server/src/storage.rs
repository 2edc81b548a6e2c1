//! Uploaded file storage.
//!
//! # Responsibility
//! - Persist uploaded bytes under a folder and return their public URL.
//!
//! # Invariants
//! - Stored names are `<uuid>-<sanitized original name>`; callers cannot
//!   choose a path outside the storage root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

const MAX_NAME_CHARS: usize = 80;

/// Location of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Path relative to the storage root, `/`-separated.
    pub key: String,
    /// URL under which the server exposes the file.
    pub url: String,
}

pub trait BlobStore: Send + Sync {
    fn put(&self, folder: &str, filename: &str, bytes: &[u8]) -> io::Result<StoredBlob>;
}

/// Stores files on the local filesystem, served under `public_prefix`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, folder: &str, filename: &str, bytes: &[u8]) -> io::Result<StoredBlob> {
        let folder = sanitize_segment(folder);
        let folder = if folder.is_empty() { "misc".to_string() } else { folder };
        let dir = self.root.join(&folder);
        fs::create_dir_all(&dir)?;

        let name = format!("{}-{}", Uuid::new_v4().simple(), sanitize_filename(filename));
        fs::write(dir.join(&name), bytes)?;

        let key = format!("{folder}/{name}");
        Ok(StoredBlob {
            url: format!("{}/{key}", self.public_prefix),
            key,
        })
    }
}

/// Keeps ASCII alphanumerics plus `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        "archivo".to_string()
    } else {
        cleaned
    }
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{sanitize_filename, BlobStore, FsBlobStore};

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\Currículum Ana.pdf"), "Curr_culum_Ana.pdf");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "archivo");
    }

    #[test]
    fn put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/uploads/");

        let blob = store.put("cvs", "cv ana.pdf", b"%PDF-1.4").unwrap();

        assert!(blob.key.starts_with("cvs/"));
        assert!(blob.key.ends_with("-cv_ana.pdf"));
        assert_eq!(blob.url, format!("/uploads/{}", blob.key));
        let stored = std::fs::read(dir.path().join(&blob.key)).unwrap();
        assert_eq!(stored, b"%PDF-1.4");
    }

    #[test]
    fn folder_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/uploads");

        let blob = store.put("../..", "x.png", b"png").unwrap();

        assert!(blob.key.starts_with("misc/"));
        assert!(dir.path().join(&blob.key).exists());
    }
}
