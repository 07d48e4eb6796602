//! Music-term normalization and fuzzy string ratios.

use regex::Regex;
use std::sync::OnceLock;

fn replacements() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"\bfeat\b", "featuring"),
            (r"\bft\b", "featuring"),
            (r"\bw/\b", "with"),
            (r"\bvs\b", "versus"),
        ]
        .iter()
        .map(|(pat, rep)| (Regex::new(pat).expect("valid regex"), *rep))
        .collect()
    })
}

/// Normalize common music terminology for matching: case-fold, then expand
/// abbreviations at word boundaries. Idempotent.
pub fn normalize_music_terms(text: &str) -> String {
    let mut text = text.to_lowercase();
    for (pattern, replacement) in replacements() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text
}

/// Preprocess a search query with the same rules applied to file names.
pub fn preprocess_query(query: &str) -> String {
    normalize_music_terms(query).trim().to_string()
}

/// Token-order-invariant similarity ratio in [0, 100]: both strings are
/// lowercased, whitespace-tokenized, sorted and re-joined before a
/// normalized Levenshtein comparison.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a = token_sort_key(a);
    let b = token_sort_key(b);
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(&a, &b) * 100.0
}

fn token_sort_key(text: &str) -> String {
    let text = text.to_lowercase();
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-order-invariant similarity in [0, 100].
///
/// The better of two views wins: the whole-string token-sort ratio, and the
/// mean best-alignment of each query token against the candidate's tokens.
/// The second view keeps a one-word query competitive against a long file
/// name that contains (a near-miss of) that word.
pub fn fuzzy_ratio(query: &str, text: &str) -> f64 {
    token_sort_ratio(query, text).max(token_alignment_ratio(query, text))
}

fn token_alignment_ratio(query: &str, text: &str) -> f64 {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    let text_tokens: Vec<&str> = text.split_whitespace().collect();
    if query_tokens.is_empty() || text_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = query_tokens
        .iter()
        .map(|q| {
            text_tokens
                .iter()
                .map(|t| strsim::normalized_levenshtein(q, t))
                .fold(0.0_f64, f64::max)
        })
        .sum();
    total / query_tokens.len() as f64 * 100.0
}

/// Best similarity of the shorter string against any equally-long window of
/// the longer one, in [0, 100]. Containment counts as a full match.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if shorter.is_empty() {
        return 0.0;
    }
    if longer.contains(&shorter) {
        return 100.0;
    }

    let longer: Vec<char> = longer.chars().collect();
    let window = shorter.chars().count();
    let mut best: f64 = 0.0;
    for start in 0..=longer.len().saturating_sub(window) {
        let slice: String = longer[start..start + window].iter().collect();
        best = best.max(strsim::normalized_levenshtein(&shorter, &slice) * 100.0);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_featuring_abbreviations() {
        assert_eq!(normalize_music_terms("feat"), "featuring");
        assert_eq!(normalize_music_terms("FT"), "featuring");
        assert_eq!(
            normalize_music_terms("Outside feat. Ellie"),
            "outside featuring. ellie"
        );
    }

    #[test]
    fn expands_versus_at_word_boundaries_only() {
        assert_eq!(normalize_music_terms("a vs b"), "a versus b");
        assert_eq!(normalize_music_terms("canvas"), "canvas");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["feat", "FT something", "A vs B remix", "already featuring"] {
            let once = normalize_music_terms(input);
            assert_eq!(normalize_music_terms(&once), once);
        }
    }

    #[test]
    fn token_sort_ratio_ignores_word_order() {
        let forward = token_sort_ratio("calvin harris outside", "outside calvin harris");
        assert_eq!(forward, 100.0);
    }

    #[test]
    fn token_sort_ratio_scores_typos_high_but_not_exact() {
        let score = token_sort_ratio("outsde", "outside");
        assert!(score > 70.0 && score < 100.0, "got {score}");
    }

    #[test]
    fn fuzzy_ratio_keeps_single_word_typo_competitive_against_long_names() {
        let score = fuzzy_ratio("outsde", "calvin harris   outside (featuring  ellie goulding)");
        assert!(score >= 60.0, "got {score}");
    }

    #[test]
    fn fuzzy_ratio_stays_low_for_unrelated_strings() {
        assert!(fuzzy_ratio("zzzzqqqq", "completely unrelated") < 30.0);
    }

    #[test]
    fn partial_ratio_counts_containment_as_full_match() {
        assert_eq!(partial_ratio("harris", "Calvin Harris - Outside"), 100.0);
        assert!(partial_ratio("haris", "Calvin Harris") >= 80.0);
        assert_eq!(partial_ratio("", "anything"), 0.0);
    }
}
