//! Sorted, newline-delimited set files.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use cleanvid_models::{check_name, NameSet, SetName};

use crate::error::{StateError, StateResult};

/// Durable storage for the monitor's three name sets.
///
/// Each set lives in its own file under `dir`, one name per line, sorted.
/// Saves never truncate the live file: the new content is written and
/// synced to a hidden temp file in the same directory, then renamed over
/// the target, so a reader sees either the old set or the new one.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the set files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a set.
    pub fn path(&self, set: SetName) -> PathBuf {
        self.dir.join(set.file_name())
    }

    fn temp_path(&self, set: SetName) -> PathBuf {
        self.dir.join(format!(".{}.tmp", set.file_name()))
    }

    /// Load a set. A missing file is the empty set (first run).
    pub async fn load(&self, set: SetName) -> StateResult<NameSet> {
        let path = self.path(set);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} set at {}, starting empty", set, path.display());
                return Ok(NameSet::new());
            }
            Err(e) => return Err(StateError::io(path, e)),
        };

        parse_set(&path, &bytes)
    }

    /// Replace a set with `names`.
    pub async fn save(&self, set: SetName, names: &NameSet) -> StateResult<()> {
        for name in names {
            validate_name(name)?;
        }

        let path = self.path(set);
        let tmp = self.temp_path(set);
        let contents = render_set(names);

        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(contents.as_bytes()).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StateError::io(tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StateError::io(path, e));
        }

        sync_dir(&self.dir).await;

        debug!("Saved {} {} names to {}", names.len(), set, path.display());
        Ok(())
    }
}

/// Make the rename durable. Best effort: not every platform can fsync a directory.
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir).await {
        let _ = handle.sync_all().await;
    }
}

fn validate_name(name: &str) -> StateResult<()> {
    check_name(name).map_err(|reason| StateError::invalid_name(name, reason))
}

fn render_set(names: &NameSet) -> String {
    let mut out = String::new();
    for name in names {
        out.push_str(name);
        out.push('\n');
    }
    out
}

fn parse_set(path: &Path, bytes: &[u8]) -> StateResult<NameSet> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        let line = bytes[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
        StateError::malformed(path, line, "not valid UTF-8")
    })?;

    let mut names = NameSet::new();
    for (idx, raw) in text.split('\n').enumerate() {
        let name = raw.strip_suffix('\r').unwrap_or(raw);
        if name.is_empty() {
            continue;
        }
        if let Err(reason) = check_name(name) {
            return Err(StateError::malformed(
                path,
                idx + 1,
                format!("{:?} {}", name, reason),
            ));
        }
        names.insert(name);
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(names: &[&str]) -> NameSet {
        names.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_set() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());

        for name in SetName::ALL {
            assert!(store.load(name).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let shows = set(&["ShowB", "ShowA", "Show With Spaces", "Ünïcode"]);

        store.save(SetName::Known, &shows).await.unwrap();
        assert_eq!(store.load(SetName::Known).await.unwrap(), shows);

        store.save(SetName::Known, &NameSet::new()).await.unwrap();
        assert!(store.load(SetName::Known).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_is_sorted_and_newline_terminated() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());

        store
            .save(SetName::ReportedErrors, &set(&["b.mkv", "a.mkv"]))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(dir.path().join("errors.txt")).unwrap();
        assert_eq!(contents, "a.mkv\nb.mkv\n");
        assert!(!dir.path().join(".errors.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_set() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());

        store.save(SetName::Approved, &set(&["ShowA", "ShowB"])).await.unwrap();
        store.save(SetName::Approved, &set(&["ShowC"])).await.unwrap();

        assert_eq!(store.load(SetName::Approved).await.unwrap(), set(&["ShowC"]));
    }

    #[tokio::test]
    async fn test_reads_files_written_by_hand() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cleaning.txt"), "ShowB\r\n\nShowA").unwrap();

        let store = StateStore::new(dir.path());
        assert_eq!(
            store.load(SetName::Approved).await.unwrap(),
            set(&["ShowA", "ShowB"])
        );
    }

    #[tokio::test]
    async fn test_malformed_content_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("found.txt"), "ShowA\nnested/path\n").unwrap();

        let store = StateStore::new(dir.path());
        let err = store.load(SetName::Known).await.unwrap_err();
        assert!(matches!(err, StateError::Malformed { line: 2, .. }));

        std::fs::write(dir.path().join("found.txt"), [b'o', b'k', b'\n', 0xff, 0xfe]).unwrap();
        let err = store.load(SetName::Known).await.unwrap_err();
        assert!(matches!(err, StateError::Malformed { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_rejects_names_that_cannot_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());

        let err = store
            .save(SetName::Known, &set(&["two\nlines"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidName { .. }));
        assert!(!store.path(SetName::Known).exists());
    }
}
