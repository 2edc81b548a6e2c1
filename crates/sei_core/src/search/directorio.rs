//! Type-as-you-search lookup over the researcher directory.
//!
//! Short terms list the directory instead of searching it; longer terms do a
//! substring match over name, email and institution.

use crate::model::investigador::Investigador;
use crate::repo::investigador_repo::{parse_investigador_row, INVESTIGADOR_SELECT_SQL};
use crate::search::fts::{SearchError, SearchResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

pub const MIN_TERM_CHARS: usize = 2;
pub const DEFAULT_DIRECTORY_LIMIT: u32 = 50;
const MAX_DIRECTORY_LIMIT: u32 = 200;

/// Finds active researchers by name, email or institution.
///
/// A term shorter than [`MIN_TERM_CHARS`] lists active researchers that have
/// a name, alphabetically.
pub fn search_investigadores(
    conn: &Connection,
    term: &str,
    limit: Option<u32>,
) -> SearchResult<Vec<Investigador>> {
    let limit = match limit {
        Some(0) | None => DEFAULT_DIRECTORY_LIMIT,
        Some(value) => value.min(MAX_DIRECTORY_LIMIT),
    };
    let term = term.trim();

    let (sql, bind_values) = if term.chars().count() < MIN_TERM_CHARS {
        (
            format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE activo = 1 AND nombre_completo <> ''
                 ORDER BY nombre_completo COLLATE NOCASE ASC, id ASC
                 LIMIT ?1;"
            ),
            vec![Value::Integer(i64::from(limit))],
        )
    } else {
        let pattern = format!("%{}%", escape_like(term));
        (
            format!(
                "{INVESTIGADOR_SELECT_SQL}
                 WHERE activo = 1
                   AND (nombre_completo LIKE ?1 ESCAPE '\\'
                     OR correo LIKE ?1 ESCAPE '\\'
                     OR institucion LIKE ?1 ESCAPE '\\')
                 ORDER BY nombre_completo COLLATE NOCASE ASC, id ASC
                 LIMIT ?2;"
            ),
            vec![Value::Text(pattern), Value::Integer(i64::from(limit))],
        )
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let item = parse_investigador_row(row)
            .map_err(|err| SearchError::InvalidData(err.to_string()))?;
        items.push(item);
    }
    Ok(items)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_protects_wildcards() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("ruiz"), "ruiz");
    }
}
