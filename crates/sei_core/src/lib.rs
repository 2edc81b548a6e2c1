//! Domain core of SEI, the state directory of researchers.
//!
//! Models, SQLite persistence, search, CV field extraction and the account
//! services live here. The HTTP server and the CLI are thin shells over the
//! services exported below.

pub mod auth;
pub mod db;
pub mod extract;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod slug;

pub use auth::{AuthError, AuthResult, AuthService, SessionToken, SessionUser};
pub use db::{now_epoch_ms, open_db, open_db_in_memory, DbError};
pub use extract::{extract_fields, extract_pdf_text, ExtractError, ExtractedFields, PdfText};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::investigador::{Investigador, InvestigadorUpdate, NuevoInvestigador, Origen};
pub use model::{RowId, ValidationError};
pub use repo::{RepoError, RepoResult};
pub use search::directorio::search_investigadores;
pub use search::fts::{search_all, SearchError, SearchHit, SearchKind, SearchQuery, SearchResult};
pub use service::{ServiceError, ServiceResult};

/// Liveness answer shared by `GET /health` and `sei ping`.
pub fn ping() -> &'static str {
    "pong"
}

/// Version of this crate as built, reported by the server banner and the CLI.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #[test]
    fn probes_report_pong_and_a_semver() {
        assert_eq!(super::ping(), "pong");
        assert_eq!(super::core_version().split('.').count(), 3);
    }
}
