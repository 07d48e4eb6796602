//! Fuzzy, metadata-aware song search.
//!
//! Every search builds its documents fresh from a fresh scan: nothing here
//! is persisted, and a [`SearchDocument`] lives only for the duration of
//! one call.

pub mod normalize;

use std::cmp::Ordering;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::metadata;
use normalize::{fuzzy_ratio, normalize_music_terms, preprocess_query};

/// Candidates scoring below this are dropped from the results.
const SCORE_FLOOR: f64 = 30.0;

/// Where a search text came from, in descending priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Combined "artist - title" text; both tags present.
    ArtistTitle,
    /// Other metadata-derived combinations.
    Metadata,
    /// Derived from the file name.
    Filename,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::ArtistTitle => "artist_title",
            MatchKind::Metadata => "metadata",
            MatchKind::Filename => "filename",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchText {
    pub text: String,
    pub weight: f64,
    pub kind: MatchKind,
}

/// Ephemeral per-track search data: one per candidate per query evaluation.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub file_path: String,
    pub title: String,
    pub artist: String,
    pub filename_stem: String,
    pub search_texts: Vec<SearchText>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub file_path: String,
    pub score: f64,
    pub match_text: String,
    pub match_type: String,
    pub title: String,
    pub artist: String,
}

impl MatchResult {
    /// Human-readable label: tag data when present, file name otherwise.
    pub fn display_info(&self) -> String {
        if !self.title.is_empty() && !self.artist.is_empty() {
            format!("{} - {}", self.artist, self.title)
        } else if !self.title.is_empty() {
            self.title.clone()
        } else if !self.artist.is_empty() {
            self.artist.clone()
        } else {
            crate::library::name_of(&self.file_path)
        }
    }
}

/// Build the weighted search texts for one track. Never fails; with no
/// usable metadata only the filename-derived texts are produced.
pub fn build_document(root: &Path, relative: &str) -> SearchDocument {
    let (title, artist) = metadata::extract_title_and_artist(&root.join(relative));

    let filename_stem = Path::new(relative)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| relative.to_string());

    let mut texts = Vec::new();

    if !title.is_empty() && !artist.is_empty() {
        texts.push(SearchText {
            text: format!("{artist} - {title}"),
            weight: 1.0,
            kind: MatchKind::ArtistTitle,
        });
        for text in [format!("{title} {artist}"), title.clone(), artist.clone()] {
            texts.push(SearchText {
                text,
                weight: 0.9,
                kind: MatchKind::Metadata,
            });
        }
    } else if !title.is_empty() || !artist.is_empty() {
        let only = if title.is_empty() { &artist } else { &title };
        texts.push(SearchText {
            text: only.clone(),
            weight: 0.9,
            kind: MatchKind::Metadata,
        });
    }

    let clean_stem = filename_stem.replace(['_', '-', '.'], " ");
    for text in [
        normalize_music_terms(&clean_stem),
        clean_stem,
        filename_stem.clone(),
    ] {
        texts.push(SearchText {
            text,
            weight: 0.7,
            kind: MatchKind::Filename,
        });
    }

    SearchDocument {
        file_path: relative.to_string(),
        title,
        artist,
        filename_stem,
        search_texts: texts,
    }
}

/// Rank pre-built documents against `query` and truncate to `limit`.
///
/// Per document the maximum score over all of its search texts wins:
/// exact case-folded equality scores `100 * weight`, substring containment
/// `95 * weight`, anything else the fuzzy ratio times the weight.
/// Ties keep candidate scan order (stable sort).
pub fn rank(documents: &[SearchDocument], query: &str, limit: usize) -> Vec<MatchResult> {
    let query_lower = query.to_lowercase().trim().to_string();
    let normalized_query = preprocess_query(query);

    let mut matches: Vec<MatchResult> = Vec::new();

    for doc in documents {
        let mut max_score = 0.0_f64;
        let mut best_text = String::new();
        let mut best_type = String::new();

        for entry in &doc.search_texts {
            let text_lower = entry.text.to_lowercase();
            let (score, fuzzy) = if query_lower == text_lower {
                (100.0 * entry.weight, false)
            } else if text_lower.contains(&query_lower) {
                (95.0 * entry.weight, false)
            } else {
                (
                    fuzzy_ratio(&normalized_query, &entry.text) * entry.weight,
                    true,
                )
            };

            if score > max_score {
                max_score = score;
                best_text = entry.text.clone();
                best_type = if fuzzy {
                    format!("{}_fuzzy", entry.kind.as_str())
                } else {
                    entry.kind.as_str().to_string()
                };
            }
        }

        if max_score >= SCORE_FLOOR {
            matches.push(MatchResult {
                file_path: doc.file_path.clone(),
                score: max_score,
                match_text: best_text,
                match_type: best_type,
                title: doc.title.clone(),
                artist: doc.artist.clone(),
            });
        }
    }

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(limit);
    matches
}

/// Search `candidates` (relative paths under `root`) for `query`.
///
/// An empty query is a distinct contract: the first `limit` candidates are
/// returned in input order with score 100 and `match_type = "all"`,
/// bypassing scoring entirely.
pub fn search(
    root: &Path,
    candidates: &[String],
    query: &str,
    limit: usize,
) -> Vec<MatchResult> {
    if query.trim().is_empty() {
        return candidates
            .iter()
            .take(limit)
            .map(|file| MatchResult {
                file_path: file.clone(),
                score: 100.0,
                match_text: String::new(),
                match_type: "all".to_string(),
                title: String::new(),
                artist: String::new(),
            })
            .collect();
    }

    debug!("Performing metadata search for: '{query}'");
    let documents: Vec<SearchDocument> = candidates
        .iter()
        .map(|file| build_document(root, file))
        .collect();

    rank(&documents, query, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn filename_doc(path: &str) -> SearchDocument {
        // Documents for untagged files carry only filename-derived texts.
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(path), b"x").unwrap();
        build_document(dir.path(), path)
    }

    fn tagged_doc(path: &str, artist: &str, title: &str) -> SearchDocument {
        let mut doc = filename_doc(path);
        doc.title = title.to_string();
        doc.artist = artist.to_string();
        let mut texts = vec![
            SearchText {
                text: format!("{artist} - {title}"),
                weight: 1.0,
                kind: MatchKind::ArtistTitle,
            },
            SearchText {
                text: format!("{title} {artist}"),
                weight: 0.9,
                kind: MatchKind::Metadata,
            },
            SearchText {
                text: title.to_string(),
                weight: 0.9,
                kind: MatchKind::Metadata,
            },
            SearchText {
                text: artist.to_string(),
                weight: 0.9,
                kind: MatchKind::Metadata,
            },
        ];
        texts.extend(doc.search_texts.clone());
        doc.search_texts = texts;
        doc
    }

    #[test]
    fn untagged_document_has_filename_texts_only() {
        let doc = filename_doc("Daft_Punk-One.More.Time.mp3");
        assert_eq!(doc.search_texts.len(), 3);
        assert!(doc.search_texts.iter().all(|t| t.kind == MatchKind::Filename));
        assert_eq!(doc.search_texts[1].text, "Daft Punk One More Time");
        assert_eq!(doc.search_texts[2].text, "Daft_Punk-One.More.Time");
    }

    #[test]
    fn exact_cleaned_stem_query_scores_at_least_95_on_filename_kind() {
        let doc = filename_doc("some_song.mp3");
        let results = rank(&[doc], "some song", 10);
        assert_eq!(results.len(), 1);
        assert!(results[0].score >= 95.0 * 0.7 - f64::EPSILON);
        assert!(results[0].match_type.starts_with("filename"));
    }

    #[test]
    fn empty_query_returns_first_n_in_scan_order() {
        let dir = tempdir().unwrap();
        let files: Vec<String> = (0..5).map(|i| format!("track{i}.mp3")).collect();
        let results = search(dir.path(), &files, "", 3);
        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.file_path, format!("track{i}.mp3"));
            assert_eq!(result.score, 100.0);
            assert_eq!(result.match_type, "all");
        }
    }

    #[test]
    fn empty_query_limit_exceeding_candidates_returns_all() {
        let dir = tempdir().unwrap();
        let files = vec!["only.mp3".to_string()];
        assert_eq!(search(dir.path(), &files, "  ", 10).len(), 1);
    }

    #[test]
    fn exact_match_outranks_fuzzy_match_on_other_candidate() {
        let exact = filename_doc("outside.mp3");
        let fuzzy = filename_doc("outsider anthem.mp3");
        let results = rank(&[fuzzy, exact], "outside", 10);
        assert_eq!(results[0].file_path, "outside.mp3");
    }

    #[test]
    fn low_scores_are_dropped() {
        let doc = filename_doc("completely unrelated.mp3");
        let results = rank(&[doc], "zzzzqqqq", 10);
        assert!(results.is_empty());
    }

    #[test]
    fn ties_keep_scan_order() {
        let a = filename_doc("same.mp3");
        let b = filename_doc("same.mp3");
        let mut b = b;
        b.file_path = "later/same.mp3".to_string();
        let results = rank(&[a, b], "same", 10);
        assert_eq!(results[0].file_path, "same.mp3");
        assert_eq!(results[1].file_path, "later/same.mp3");
    }

    #[test]
    fn tagged_file_outranks_untagged_on_typo_query() {
        // Library scenario: one untagged file whose name carries the song,
        // one tagged file with artist/title metadata. A typo query must
        // return both, tagged first (1.0/0.9 tier vs 0.7 tier).
        let untagged = filename_doc("Calvin Harris - Outside (feat. Ellie Goulding).flac");
        let tagged = tagged_doc("Artist.mp3", "Calvin Harris", "Outside");

        let results = rank(&[untagged, tagged], "outsde", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file_path, "Artist.mp3");
        assert_eq!(results[1].file_path, "Calvin Harris - Outside (feat. Ellie Goulding).flac");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn display_info_prefers_metadata() {
        let tagged = tagged_doc("Artist.mp3", "Calvin Harris", "Outside");
        let results = rank(&[tagged], "outside", 10);
        assert_eq!(results[0].display_info(), "Calvin Harris - Outside");

        let untagged = filename_doc("loose.mp3");
        let results = rank(&[untagged], "loose", 10);
        assert_eq!(results[0].display_info(), "loose.mp3");
    }
}
