//! Global keyword search over the `busqueda_fts` index.
//!
//! Triggers keep one row per active researcher, project and publication in
//! the index, so a hit always points at a live record.

use crate::db::DbError;
use crate::model::RowId;
use rusqlite::{named_params, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Display};
use std::str::FromStr;

pub type SearchResult<T> = Result<T, SearchError>;

const DEFAULT_LIMIT: u32 = 20;
/// Longer inputs are cut to this many terms.
const MAX_TERMS: usize = 8;
const SNIPPET_TOKENS: i64 = 10;

#[derive(Debug)]
pub enum SearchError {
    /// FTS5 rejected the MATCH expression.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "cannot search for `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "corrupt search index row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record type behind a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Investigador,
    Proyecto,
    Publicacion,
}

impl SearchKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Investigador => "investigador",
            Self::Proyecto => "proyecto",
            Self::Publicacion => "publicacion",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromStr for SearchKind {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Self::Investigador, Self::Proyecto, Self::Publicacion]
            .into_iter()
            .find(|kind| kind.as_db() == value)
            .ok_or_else(|| SearchError::InvalidData(format!("unknown kind `{value}`")))
    }
}

impl Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    /// Restricts hits to one record type.
    pub kind: Option<SearchKind>,
    pub limit: u32,
    /// Hand `text` to FTS5 untouched instead of quoting each term as a
    /// prefix match.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            limit: DEFAULT_LIMIT,
            raw_fts_syntax: false,
        }
    }

    /// MATCH expression for this query, or `None` when nothing is searchable.
    fn match_expression(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }
        if self.raw_fts_syntax {
            return Some(text.to_string());
        }
        let terms: Vec<String> = text
            .split_whitespace()
            .take(MAX_TERMS)
            .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
            .collect();
        Some(terms.join(" AND "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub kind: SearchKind,
    pub id: RowId,
    /// Public slug, present for researchers and projects.
    pub slug: Option<String>,
    pub titulo: String,
    /// Matched fragment with terms wrapped in `[` `]`.
    pub snippet: String,
}

const SEARCH_SQL: &str = "
    SELECT f.kind,
           CAST(f.ref_id AS INTEGER),
           CASE f.kind
               WHEN 'investigador' THEN (SELECT slug FROM investigadores WHERE id = CAST(f.ref_id AS INTEGER))
               WHEN 'proyecto' THEN (SELECT slug FROM proyectos WHERE id = CAST(f.ref_id AS INTEGER))
           END,
           f.titulo,
           snippet(f, 3, '[', ']', ' ... ', :tokens)
      FROM busqueda_fts AS f
     WHERE f MATCH :expr
       AND (:kind IS NULL OR f.kind = :kind)
     ORDER BY bm25(f), f.kind, CAST(f.ref_id AS INTEGER)
     LIMIT :limit";

/// Ranked hits across every indexed record type.
///
/// A blank query or a zero limit yields no hits without touching the index.
pub fn search_all(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(expr) = query.match_expression() else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let invalid = |err: rusqlite::Error| classify(err, &expr);
    let mut stmt = conn.prepare(SEARCH_SQL)?;
    let rows = stmt
        .query_map(
            named_params! {
                ":tokens": SNIPPET_TOKENS,
                ":expr": expr,
                ":kind": query.kind.map(SearchKind::as_db),
                ":limit": i64::from(query.limit),
            },
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    SearchHit {
                        kind: SearchKind::Investigador,
                        id: row.get(1)?,
                        slug: row.get(2)?,
                        titulo: row.get(3)?,
                        snippet: row.get(4)?,
                    },
                ))
            },
        )
        .map_err(invalid)?;

    let mut hits = Vec::new();
    for row in rows {
        let (kind, mut hit) = row.map_err(invalid)?;
        hit.kind = kind.parse()?;
        hits.push(hit);
    }
    Ok(hits)
}

/// Separates MATCH syntax errors, which the caller caused, from storage
/// failures.
fn classify(err: rusqlite::Error, expr: &str) -> SearchError {
    let syntax = match &err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let message = message.to_lowercase();
            ["fts5: syntax error", "malformed match", "unterminated", "no such column"]
                .iter()
                .any(|needle| message.contains(needle))
        }
        _ => false,
    };
    if syntax {
        SearchError::InvalidQuery {
            query: expr.to_string(),
            message: err.to_string(),
        }
    } else {
        SearchError::Db(DbError::Sqlite(err))
    }
}
