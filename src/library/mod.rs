mod scan;

pub use scan::scan;

use std::collections::BTreeMap;
use std::path::Path;

/// Folder name used for tracks sitting directly in the library root.
pub const ROOT_FOLDER: &str = "root";

/// The parent folder of a relative track path, `"root"` for top-level files.
pub fn folder_of(relative: &str) -> String {
    match Path::new(relative).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().into_owned(),
        _ => ROOT_FOLDER.to_string(),
    }
}

/// The file name of a relative track path.
pub fn name_of(relative: &str) -> String {
    Path::new(relative)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| relative.to_string())
}

#[derive(Debug)]
pub struct FolderSummary {
    pub folder: String,
    pub file_count: usize,
    pub sample_files: Vec<String>,
}

/// Group scanned tracks by folder, sorted by folder name.
pub fn group_by_folder(files: &[String]) -> Vec<FolderSummary> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file in files {
        grouped
            .entry(folder_of(file))
            .or_default()
            .push(name_of(file));
    }

    grouped
        .into_iter()
        .map(|(folder, names)| FolderSummary {
            folder,
            file_count: names.len(),
            sample_files: names.into_iter().take(3).collect(),
        })
        .collect()
}
