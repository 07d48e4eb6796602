//! Library-wide genre aggregation and lookup.
//!
//! Genre extraction reads every file on every call; this is the most
//! expensive operation the server performs and is deliberately uncached.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::library;
use crate::metadata;

#[derive(Debug, Clone, Serialize)]
pub struct GenreMatch {
    pub file: String,
    pub name: String,
    pub folder: String,
    pub genre: String,
}

/// Count tracks per cleaned genre string.
pub fn all_genres(root: &Path, files: &[String]) -> HashMap<String, usize> {
    info!("Extracting genres from {} files", files.len());
    let mut counts: HashMap<String, usize> = HashMap::new();
    for file in files {
        let genre = metadata::extract_genre(&root.join(file));
        *counts.entry(genre).or_insert(0) += 1;
    }
    counts
}

/// Linear scan for tracks whose genre matches `query` exactly or contains
/// it, case-insensitively.
///
/// Stops as soon as `limit` matches are collected rather than ranking the
/// whole library, so result completeness depends on traversal order. That
/// asymmetry with song search is intentional; do not "fix" it here.
pub fn search_by_genre(
    root: &Path,
    files: &[String],
    query: &str,
    limit: usize,
) -> Vec<GenreMatch> {
    let query = query.to_lowercase().trim().to_string();
    let mut matches = Vec::new();

    for file in files {
        let genre = metadata::extract_genre(&root.join(file));
        let genre_lower = genre.to_lowercase();
        if genre_lower == query || genre_lower.contains(&query) {
            matches.push(GenreMatch {
                file: file.clone(),
                name: library::name_of(file),
                folder: library::folder_of(file),
                genre,
            });
            if matches.len() >= limit {
                break;
            }
        }
    }

    matches
}
