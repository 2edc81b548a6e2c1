//! Directory search entry points.
//!
//! # Responsibility
//! - Expose full-text search backed by the SQLite FTS5 index.
//! - Expose the researcher lookup used by the directory search box.

pub mod directorio;
pub mod fts;
