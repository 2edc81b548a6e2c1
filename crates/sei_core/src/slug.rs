//! URL slug helpers for public profile and project pages.
//!
//! # Invariants
//! - Generated slugs contain only `[a-z0-9-]`, with no leading, trailing or
//!   repeated `-`.
//! - Accented Latin letters fold to their base letter (`á` -> `a`, `ñ` -> `n`).

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Converts free text into a URL-friendly slug.
///
/// Returns an empty string when nothing survives normalization.
pub fn generate_slug(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() || *ch == '-')
        .collect();

    let mut slug = String::with_capacity(folded.len());
    for ch in folded.trim().chars() {
        let mapped = if ch.is_whitespace() { '-' } else { ch };
        if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(mapped);
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Appends a row id so slugs stay unique for homonyms.
pub fn unique_slug(base: &str, id: i64) -> String {
    if base.is_empty() {
        return id.to_string();
    }
    format!("{base}-{id}")
}

/// Returns whether `slug` is already in canonical form.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}
