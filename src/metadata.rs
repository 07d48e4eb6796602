//! Best-effort tag reading.
//!
//! Extraction never fails the caller: any read or parse problem collapses
//! into the empty/"Unknown" defaults at this boundary.

use std::path::Path;

use lofty::prelude::{ItemKey, TaggedFileExt};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Sentinel used when a file carries no usable genre tag.
pub const UNKNOWN_GENRE: &str = "Unknown";

#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    /// Empty string when the tag is absent.
    pub title: String,
    /// Empty string when the tag is absent.
    pub artist: String,
    /// `"Unknown"` when the tag is absent or empty after cleaning.
    pub genre: String,
}

/// Read title, artist and genre from `path`.
pub fn extract(path: &Path) -> TrackMetadata {
    let (title, artist, genre) = match read_raw_tags(path) {
        Some(fields) => fields,
        None => {
            debug!("Could not read tags from {}", path.display());
            (None, None, None)
        }
    };

    TrackMetadata {
        title: title.unwrap_or_default(),
        artist: artist.unwrap_or_default(),
        genre: clean_genre(genre.as_deref().unwrap_or("")),
    }
}

/// Read title and artist only; used by the search index builder, which has
/// no use for genre.
pub fn extract_title_and_artist(path: &Path) -> (String, String) {
    let meta = extract(path);
    (meta.title, meta.artist)
}

/// Read the cleaned genre only.
pub fn extract_genre(path: &Path) -> String {
    extract(path).genre
}

type RawFields = (Option<String>, Option<String>, Option<String>);

/// Walk the file's tags in priority order (primary format tag first, then
/// any remaining tag blocks); the first non-empty hit per field wins.
fn read_raw_tags(path: &Path) -> Option<RawFields> {
    let tagged = lofty::read_from_path(path).ok()?;

    let mut title = None;
    let mut artist = None;
    let mut genre = None;

    let primary = tagged.primary_tag();
    let tags = primary.into_iter().chain(
        tagged
            .tags()
            .iter()
            .filter(|t| primary.map(|p| !std::ptr::eq(*t, p)).unwrap_or(true)),
    );

    for tag in tags {
        fill(&mut title, tag.get_string(&ItemKey::TrackTitle));
        fill(&mut artist, tag.get_string(&ItemKey::TrackArtist));
        fill(&mut genre, tag.get_string(&ItemKey::Genre));
    }

    Some((title, artist, genre))
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        if let Some(v) = value {
            let v = v.trim();
            if !v.is_empty() {
                *slot = Some(v.to_string());
            }
        }
    }
}

fn legacy_genre_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(\d+\)").expect("valid regex"))
}

/// Clean a raw genre tag value:
/// strip a leading ID3v1 numeric code like `(13)`, strip surrounding
/// parentheses, title-case, default to `"Unknown"` when nothing is left.
pub fn clean_genre(raw: &str) -> String {
    let mut genre = raw.trim().to_string();
    genre = legacy_genre_code().replace(&genre, "").trim().to_string();
    if genre.starts_with('(') && genre.ends_with(')') && genre.len() >= 2 {
        genre = genre[1..genre.len() - 1].to_string();
    }
    let genre = title_case(&genre);
    if genre.is_empty() {
        UNKNOWN_GENRE.to_string()
    } else {
        genre
    }
}

/// Uppercase the first letter of every alphanumeric run, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
