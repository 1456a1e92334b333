//! Batch cleaning of approved units.
//!
//! Every approved unit is walked recursively; each eligible file is handed
//! to the [`Cleaner`] one at a time. A failing file never stops the batch:
//! its base name goes into [`BatchReport::failures`] and the next file is
//! attempted.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{debug, warn, Instrument};
use walkdir::WalkDir;

use cleanvid_media::{CleanOutcome, CleanRequest, Cleaner, FailureKind, MediaResult};
use cleanvid_models::{check_name, is_eligible, FileTask, NameSet};

use crate::logging::UnitLogger;
use crate::metrics;

/// What one batch pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files cleaned successfully
    pub cleaned: usize,
    /// Base names of files (or units) that failed
    pub failures: NameSet,
    /// Whether shutdown stopped the batch early
    pub interrupted: bool,
}

/// Files found under one unit.
#[derive(Debug, Default)]
struct UnitListing {
    tasks: Vec<FileTask>,
    /// (name, reason) for paths that could not be traversed
    unreadable: Vec<(String, String)>,
}

/// Runs the cleaner over every approved unit.
pub struct BatchJobRunner<C> {
    cleaner: C,
    root: PathBuf,
    language: String,
    word_list: PathBuf,
}

impl<C: Cleaner> BatchJobRunner<C> {
    pub fn new(
        cleaner: C,
        root: impl Into<PathBuf>,
        language: impl Into<String>,
        word_list: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cleaner,
            root: root.into(),
            language: language.into(),
            word_list: word_list.into(),
        }
    }

    pub fn cleaner(&self) -> &C {
        &self.cleaner
    }

    /// Clean every eligible file of every unit in `approved`, in sorted order.
    ///
    /// Shutdown is checked before each file; the file in flight always
    /// finishes.
    pub async fn run(&self, approved: &NameSet, shutdown: &watch::Receiver<bool>) -> BatchReport {
        let mut report = BatchReport::default();

        for unit in approved {
            if *shutdown.borrow() {
                report.interrupted = true;
                break;
            }

            let logger = UnitLogger::new(unit, "clean");
            let span = logger.create_span();
            self.run_unit(unit, &logger, shutdown, &mut report)
                .instrument(span)
                .await;

            if report.interrupted {
                break;
            }
        }

        if report.interrupted {
            warn!("Shutdown requested, stopping batch early");
        }
        report
    }

    async fn run_unit(
        &self,
        unit: &str,
        logger: &UnitLogger,
        shutdown: &watch::Receiver<bool>,
        report: &mut BatchReport,
    ) {
        if let Err(reason) = check_name(unit) {
            logger.log_error(&format!("Skipping unit {:?}: {}", unit, reason));
            return;
        }

        let listing = self.walk_unit(unit).await;

        for (name, reason) in listing.unreadable {
            logger.log_warning(&name, &format!("Could not read: {}", reason));
            record_failure(report, logger, &name, FailureKind::Io);
        }

        if listing.tasks.is_empty() {
            debug!(unit = %unit, "Nothing to clean");
            return;
        }

        logger.log_start(&format!("{} files to clean", listing.tasks.len()));
        let mut cleaned = 0usize;

        for task in &listing.tasks {
            if *shutdown.borrow() {
                report.interrupted = true;
                break;
            }

            let name = task.file_name();
            logger.log_progress(&name, "Cleaning");

            match self.process(task).await {
                Ok(outcome) => {
                    logger.log_progress(
                        &name,
                        &format!("Cleaned, {} muted intervals", outcome.muted_spans),
                    );
                    metrics::record_file_cleaned();
                    cleaned += 1;
                }
                Err(e) => {
                    let kind = e.kind();
                    logger.log_warning(&name, &format!("Failed ({}): {}", kind, e));
                    if let Some(stderr) = e.stderr() {
                        debug!(file = %name, "FFmpeg stderr:\n{}", stderr);
                    }
                    record_failure(report, logger, &name, kind);
                }
            }
        }

        report.cleaned += cleaned;
        if report.interrupted {
            return;
        }
        logger.log_completion(&format!(
            "{} of {} files cleaned",
            cleaned,
            listing.tasks.len()
        ));
    }

    /// Clean one file, then remove the source and the subtitle it used.
    async fn process(&self, task: &FileTask) -> MediaResult<CleanOutcome> {
        let request = CleanRequest {
            video: task.path.clone(),
            language: self.language.clone(),
            output: task.output_path(),
            word_list: self.word_list.clone(),
        };

        let outcome = self.cleaner.clean(&request).await?;

        tokio::fs::remove_file(&task.path).await?;
        if outcome.subtitle != task.path {
            match tokio::fs::remove_file(&outcome.subtitle).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(outcome)
    }

    async fn walk_unit(&self, unit: &str) -> UnitListing {
        let root = self.root.clone();
        let owned = unit.to_string();

        match tokio::task::spawn_blocking(move || list_unit(&root, &owned)).await {
            Ok(listing) => listing,
            Err(e) => UnitListing {
                tasks: Vec::new(),
                unreadable: vec![(unit.to_string(), e.to_string())],
            },
        }
    }
}

/// Add a failed file to the report under a name the error set can store.
fn record_failure(report: &mut BatchReport, logger: &UnitLogger, name: &str, kind: FailureKind) {
    metrics::record_file_failed(kind.as_str());
    match reportable_name(name) {
        Some(reported) => {
            report.failures.insert(reported);
        }
        None => logger.log_warning(name, "Failure not reported: unusable file name"),
    }
}

/// `name` with line breaks escaped, so it fits on one line of a set file.
///
/// Returns `None` for names that are still not storable.
fn reportable_name(name: &str) -> Option<String> {
    let name = if name.contains(['\n', '\r']) {
        name.escape_debug().to_string()
    } else {
        name.to_string()
    };
    check_name(&name).ok().map(|()| name)
}

/// Walk a unit directory for eligible files, sorted by path.
///
/// A traversal error is reported under the failing path's file name, or
/// the unit name when the unit directory itself cannot be read.
fn list_unit(root: &Path, unit: &str) -> UnitListing {
    let unit_dir = root.join(unit);
    let mut listing = UnitListing::default();

    for entry in WalkDir::new(&unit_dir).follow_links(true) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_eligible(entry.path()) {
                    listing.tasks.push(FileTask::new(unit, entry.path()));
                }
            }
            Err(e) => {
                let name = e
                    .path()
                    .filter(|p| *p != unit_dir.as_path())
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| unit.to_string());
                listing.unreadable.push((name, e.to_string()));
            }
        }
    }

    listing.tasks.sort();
    listing
}
