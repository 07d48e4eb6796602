use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

/// Recursively enumerate audio files under `root`, returning paths relative
/// to it in filesystem-traversal order.
///
/// Results are not cached: callers re-scan per operation, so a path from an
/// earlier scan may have gone stale and must be re-validated before use.
/// Unreadable directories are skipped with a warning.
pub fn scan(root: &Path, extensions: &[String]) -> Vec<String> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_audio_file(path, extensions) {
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_string_lossy().into_owned());
            }
        }
    }

    debug!("Found {} audio files under {}", files.len(), root.display());
    files
}
