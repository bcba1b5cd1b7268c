//! Source-header → column-key mapping.
//!
//! Each transformer declares an alias table of the source columns it understands. Headers are
//! compared after [`normalize_header`], so spelling drift between export variants (case,
//! accents, stray whitespace) resolves to the same key. Resolution happens once, against the
//! actual header row, before any row is read.

use std::fmt::Debug;

use crate::error::{ProcessingError, ProcessingResult};

/// One understood source column and the header spellings it may appear under.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAlias<K> {
    pub key: K,
    pub names: &'static [&'static str],
}

/// Header positions resolved for a given alias table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns<K> {
    found: Vec<(K, usize)>,
    missing: Vec<K>,
}

impl<K: Copy + PartialEq + Debug> ResolvedColumns<K> {
    /// Match `headers` against `aliases`; the first matching header wins.
    pub fn resolve(headers: &[String], aliases: &[ColumnAlias<K>]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for alias in aliases {
            let wanted: Vec<String> = alias.names.iter().map(|n| normalize_header(n)).collect();
            match normalized.iter().position(|h| wanted.contains(h)) {
                Some(idx) => found.push((alias.key, idx)),
                None => missing.push(alias.key),
            }
        }
        Self { found, missing }
    }

    /// Column index of `key`, if the header row carries it.
    pub fn index(&self, key: K) -> Option<usize> {
        self.found.iter().find(|(k, _)| *k == key).map(|(_, i)| *i)
    }

    /// Keys found, in alias-table order.
    pub fn found_keys(&self) -> impl Iterator<Item = K> + '_ {
        self.found.iter().map(|(k, _)| *k)
    }

    /// Keys with no matching header.
    pub fn missing(&self) -> &[K] {
        &self.missing
    }

    /// Like [`Self::index`], but a missing column is a [`ProcessingError::SchemaMismatch`].
    pub fn require(&self, key: K, headers: &[String]) -> ProcessingResult<usize> {
        self.index(key).ok_or_else(|| ProcessingError::SchemaMismatch {
            message: format!("missing required column {key:?}. headers={headers:?}"),
        })
    }
}

/// Canonical comparison form of a header: trimmed, BOM-free, lowercase, accents folded and
/// internal whitespace collapsed.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}
