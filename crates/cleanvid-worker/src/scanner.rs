//! Discovery of units under the watched root.

use std::path::Path;

use cleanvid_models::NameSet;
use tracing::warn;

/// Names of the immediate subdirectories of `root`.
///
/// Files directly under the root are ignored. Symlinks to directories count
/// as units. Names that cannot be stored in a set file (line breaks, or
/// bytes that are not UTF-8) are skipped with a warning.
pub async fn scan(root: &Path) -> std::io::Result<NameSet> {
    let mut units = NameSet::new();
    let mut entries = tokio::fs::read_dir(root).await?;

    while let Some(entry) = entries.next_entry().await? {
        let is_dir = match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) => metadata.is_dir(),
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !is_dir {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Skipping directory with a non-UTF-8 name: {:?}", raw);
                continue;
            }
        };
        if name.contains(['\n', '\r']) {
            warn!("Skipping directory with a line break in its name: {:?}", name);
            continue;
        }
        units.insert(name);
    }

    Ok(units)
}

/// Units present in `all` but not yet in `known`.
pub fn diff_new(all: &NameSet, known: &NameSet) -> NameSet {
    all.difference(known)
}
