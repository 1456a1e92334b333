//! File eligibility and cleaned-output naming.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Marker inserted before the extension of every cleaned output.
///
/// A file whose name contains the marker is never cleaned again.
pub const CLEAN_MARKER: &str = "_clean";

/// Extensions (lowercase, without dot) treated as subtitle files.
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "idx", "vtt"];

/// A media file selected for cleaning in the current batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileTask {
    /// Unit (top-level directory) the file belongs to
    pub unit: String,
    /// Absolute or root-relative path of the file
    pub path: PathBuf,
}

impl FileTask {
    pub fn new(unit: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            unit: unit.into(),
            path: path.into(),
        }
    }

    /// Base name used to report failures.
    pub fn file_name(&self) -> String {
        file_name_lossy(&self.path)
    }

    /// Where the cleaned output of this file is written.
    pub fn output_path(&self) -> PathBuf {
        cleaned_output_path(&self.path)
    }
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether the file name carries the cleaned marker.
pub fn is_cleaned(path: &Path) -> bool {
    file_name_lossy(path).contains(CLEAN_MARKER)
}

/// Whether the file has a subtitle extension (case-insensitive).
pub fn is_subtitle(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the file name starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    file_name_lossy(path).starts_with('.')
}

/// Whether a regular file should be cleaned.
///
/// Only the file name is inspected, so a unit directory whose own name
/// contains the marker is still processed.
pub fn is_eligible(path: &Path) -> bool {
    !is_hidden(path) && !is_cleaned(path) && !is_subtitle(path)
}

/// `dir/movie.mkv` becomes `dir/movie_clean.mkv`.
pub fn cleaned_output_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, CLEAN_MARKER, ext.to_string_lossy()),
        None => format!("{}{}", stem, CLEAN_MARKER),
    };

    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility() {
        assert!(is_eligible(Path::new("/data/ShowB/movie.mkv")));
        assert!(!is_eligible(Path::new("/data/ShowB/movie.srt")));
        assert!(!is_eligible(Path::new("/data/ShowB/movie.SRT")));
        assert!(!is_eligible(Path::new("/data/ShowB/movie_cleaned.mkv")));
        assert!(!is_eligible(Path::new("/data/ShowB/movie_clean.mkv")));
        assert!(!is_eligible(Path::new("/data/ShowB/.DS_Store")));
    }

    #[test]
    fn test_marker_in_directory_name_is_ignored() {
        assert!(is_eligible(Path::new("/data/The_Clean_Show/my_clean_room/ep1.mkv")));
        assert!(is_eligible(Path::new("/data/dry_cleaners/ep1.mkv")));
    }

    #[test]
    fn test_cleaned_output_path() {
        assert_eq!(
            cleaned_output_path(Path::new("/data/ShowB/movie.mkv")),
            PathBuf::from("/data/ShowB/movie_clean.mkv")
        );
        assert_eq!(
            cleaned_output_path(Path::new("/data/ShowB/S01E01.part1.mp4")),
            PathBuf::from("/data/ShowB/S01E01.part1_clean.mp4")
        );
        assert_eq!(
            cleaned_output_path(Path::new("/data/ShowB/raw")),
            PathBuf::from("/data/ShowB/raw_clean")
        );
    }

    #[test]
    fn test_output_is_never_eligible() {
        let task = FileTask::new("ShowB", "/data/ShowB/movie.mkv");
        assert_eq!(task.file_name(), "movie.mkv");
        assert!(!is_eligible(&task.output_path()));
    }
}
