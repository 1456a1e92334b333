//! The monitor control loop.
//!
//! One cycle: scan the root, announce new units and wait for approval, clean
//! every approved unit, report new failures. Cycles repeat every
//! `interval` until shutdown is signalled.

use std::fmt::Display;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use cleanvid_media::Cleaner;
use cleanvid_models::{check_name, NameSet, SetName};
use cleanvid_queue::{Approval, Broker, CoordinationClient, FailureTracker};
use cleanvid_state::StateStore;

use crate::config::MonitorConfig;
use crate::error::WorkerResult;
use crate::error_tracker::ErrorTracker;
use crate::metrics;
use crate::runner::{BatchJobRunner, BatchReport};
use crate::scanner::{diff_new, scan};

/// Broker failures logged in a row before the rest are suppressed.
const MAX_LOGGED_BROKER_FAILURES: u32 = 3;

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Units seen for the first time
    pub discovered: NameSet,
    /// Outcome of the approval wait, if new units were announced
    pub approval: Option<Approval>,
    pub batch: BatchReport,
    /// Failures published this cycle
    pub reported: NameSet,
}

/// Watches the root and drives the clean cycle.
pub struct Monitor<B, C> {
    config: MonitorConfig,
    store: StateStore,
    client: CoordinationClient<B>,
    runner: BatchJobRunner<C>,
    errors: ErrorTracker,
    broker_failures: FailureTracker,
    shutdown: watch::Receiver<bool>,
}

impl<B: Broker, C: Cleaner> Monitor<B, C> {
    pub fn new(config: MonitorConfig, broker: B, cleaner: C, shutdown: watch::Receiver<bool>) -> Self {
        let store = config.state_store();
        let client = CoordinationClient::new(broker, config.coordination());
        let runner = BatchJobRunner::new(
            cleaner,
            config.directory.clone(),
            config.subtitle_language.clone(),
            config.word_list_path(),
        );

        Self {
            errors: ErrorTracker::new(store.clone()),
            store,
            client,
            runner,
            broker_failures: FailureTracker::new(MAX_LOGGED_BROKER_FAILURES),
            shutdown,
            config,
        }
    }

    pub fn client(&self) -> &CoordinationClient<B> {
        &self.client
    }

    pub fn runner(&self) -> &BatchJobRunner<C> {
        &self.runner
    }

    /// Run cycles until shutdown.
    ///
    /// Returns an error only for fatal conditions (unreadable or corrupted
    /// state); broker and per-file failures are retried next cycle.
    pub async fn run(mut self) -> WorkerResult<()> {
        info!(
            "Monitoring {} every {:?}",
            self.config.directory.display(),
            self.config.interval()
        );

        loop {
            self.run_cycle().await?;

            if *self.shutdown.borrow() {
                break;
            }

            let interval = self.config.interval();
            debug!("Sleeping for {:?}", interval);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Monitor stopped");
        Ok(())
    }

    /// Run one scan, approve, clean and report cycle.
    pub async fn run_cycle(&mut self) -> WorkerResult<CycleReport> {
        metrics::record_cycle();
        let mut report = CycleReport::default();

        let known = self.store.load(SetName::Known).await?;
        let mut approved = self.store.load(SetName::Approved).await?;

        match scan(&self.config.directory).await {
            Ok(all) => {
                let new_units = diff_new(&all, &known);
                if !new_units.is_empty() {
                    info!("Found new units: {}", new_units);
                    metrics::record_units_discovered(new_units.len());

                    match self.client.announce(&new_units, &mut self.shutdown).await {
                        Ok(approval) => {
                            self.broker_recovered();
                            self.store.save(SetName::Known, &all).await?;

                            if let Approval::Approved(names) = &approval {
                                let accepted = accept_names(names);
                                if !accepted.is_empty() {
                                    approved.merge(&accepted);
                                    self.store.save(SetName::Approved, &approved).await?;
                                }
                            }
                            report.approval = Some(approval);
                        }
                        Err(e) => self.broker_failed("announce new units", &e),
                    }
                    report.discovered = new_units;
                }
            }
            Err(e) => error!(
                "Could not scan {}: {}",
                self.config.directory.display(),
                e
            ),
        }

        metrics::set_approved_units(approved.len());
        report.batch = self.runner.run(&approved, &self.shutdown).await;

        match self.errors.track(&self.client, &report.batch.failures).await {
            Ok(delta) => {
                if !delta.is_empty() {
                    self.broker_recovered();
                }
                report.reported = delta;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => self.broker_failed("report failed files", &e),
        }

        Ok(report)
    }

    fn broker_failed(&mut self, operation: &str, err: &dyn Display) {
        if self.broker_failures.record_failure() {
            warn!("Could not {}, will retry next cycle: {}", operation, err);
        }
    }

    fn broker_recovered(&mut self) {
        if self.broker_failures.record_success() {
            info!("Broker reachable again");
        }
    }
}

/// Approved names that are usable as unit names.
fn accept_names(names: &NameSet) -> NameSet {
    names
        .iter()
        .filter(|name| match check_name(name) {
            Ok(()) => true,
            Err(reason) => {
                warn!("Ignoring approved unit {:?}: {}", name, reason);
                false
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCleaner;
    use cleanvid_queue::MemoryBroker;
    use futures_util::StreamExt;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn set(names: &[&str]) -> NameSet {
        names.iter().copied().collect()
    }

    fn config(root: &Path, approval_timeout: Duration) -> MonitorConfig {
        MonitorConfig {
            directory: root.to_path_buf(),
            approval_timeout,
            broker_max_retries: 0,
            ..MonitorConfig::default()
        }
    }

    fn monitor(
        root: &Path,
        broker: &MemoryBroker,
        cleaner: ScriptedCleaner,
        approval_timeout: Duration,
    ) -> (Monitor<MemoryBroker, ScriptedCleaner>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let monitor = Monitor::new(config(root, approval_timeout), broker.clone(), cleaner, rx);
        (monitor, tx)
    }

    /// Answer the next `found` announcement with `payload` on `to_clean`.
    async fn approve_next(broker: &MemoryBroker, payload: &'static str) -> tokio::task::JoinHandle<()> {
        let mut found = broker.subscribe("cleanvid/found").await.unwrap();
        let remote = broker.clone();
        tokio::spawn(async move {
            if found.next().await.is_some() {
                remote.publish("cleanvid/to_clean", payload).await.unwrap();
            }
        })
    }

    #[tokio::test]
    async fn test_new_unit_is_announced_and_approved() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("ShowA")).unwrap();
        std::fs::create_dir(dir.path().join("ShowB")).unwrap();
        let store = StateStore::new(dir.path());
        store.save(SetName::Known, &set(&["ShowA"])).await.unwrap();

        let broker = MemoryBroker::new();
        let responder = approve_next(&broker, r#"["ShowB"]"#).await;
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        let report = monitor.run_cycle().await.unwrap();
        responder.await.unwrap();

        assert_eq!(report.discovered, set(&["ShowB"]));
        assert_eq!(report.approval, Some(Approval::Approved(set(&["ShowB"]))));
        assert_eq!(broker.published("cleanvid/found"), vec![r#"["ShowB"]"#]);
        assert_eq!(store.load(SetName::Known).await.unwrap(), set(&["ShowA", "ShowB"]));
        assert_eq!(store.load(SetName::Approved).await.unwrap(), set(&["ShowB"]));
    }

    #[tokio::test]
    async fn test_approved_unit_is_cleaned_in_the_same_cycle() {
        let dir = TempDir::new().unwrap();
        let show = dir.path().join("ShowB");
        std::fs::create_dir(&show).unwrap();
        std::fs::write(show.join("movie.mkv"), b"data").unwrap();

        let broker = MemoryBroker::new();
        let responder = approve_next(&broker, r#"["ShowB"]"#).await;
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        let report = monitor.run_cycle().await.unwrap();
        responder.await.unwrap();

        assert_eq!(report.batch.cleaned, 1);
        assert!(show.join("movie_clean.mkv").exists());
        assert!(!show.join("movie.mkv").exists());
    }

    #[tokio::test]
    async fn test_nothing_new_skips_approval() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("ShowA")).unwrap();
        let store = StateStore::new(dir.path());
        store.save(SetName::Known, &set(&["ShowA"])).await.unwrap();
        store.save(SetName::Approved, &set(&["ShowA"])).await.unwrap();

        let broker = MemoryBroker::new();
        broker.set_unavailable(true);
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        let report = monitor.run_cycle().await.unwrap();

        assert!(report.discovered.is_empty());
        assert!(report.approval.is_none());
        assert_eq!(store.load(SetName::Approved).await.unwrap(), set(&["ShowA"]));
    }

    #[tokio::test]
    async fn test_persistent_failure_is_published_once() {
        let dir = TempDir::new().unwrap();
        let show = dir.path().join("ShowB");
        std::fs::create_dir(&show).unwrap();
        std::fs::write(show.join("movie.mkv"), b"data").unwrap();
        std::fs::write(show.join("other.mkv"), b"data").unwrap();
        let store = StateStore::new(dir.path());
        store.save(SetName::Known, &set(&["ShowB"])).await.unwrap();
        store.save(SetName::Approved, &set(&["ShowB"])).await.unwrap();

        let broker = MemoryBroker::new();
        let (mut monitor, _tx) = monitor(
            dir.path(),
            &broker,
            ScriptedCleaner::failing(&["movie.mkv"]),
            Duration::from_secs(5),
        );

        let first = monitor.run_cycle().await.unwrap();
        for _ in 0..3 {
            let again = monitor.run_cycle().await.unwrap();
            assert_eq!(again.batch.failures, set(&["movie.mkv"]));
            assert!(again.reported.is_empty());
        }

        assert_eq!(first.batch.cleaned, 1);
        assert_eq!(first.reported, set(&["movie.mkv"]));
        assert_eq!(broker.published("cleanvid/error"), vec![r#"["movie.mkv"]"#]);
        assert_eq!(
            store.load(SetName::ReportedErrors).await.unwrap(),
            set(&["movie.mkv"])
        );
        assert_eq!(monitor.runner().cleaner().calls().len(), 5);
    }

    #[tokio::test]
    async fn test_failure_with_line_break_in_name_is_reported_once() {
        let dir = TempDir::new().unwrap();
        let show = dir.path().join("ShowB");
        std::fs::create_dir(&show).unwrap();
        std::fs::write(show.join("bad\nname.mkv"), b"data").unwrap();
        let store = StateStore::new(dir.path());
        store.save(SetName::Known, &set(&["ShowB"])).await.unwrap();
        store.save(SetName::Approved, &set(&["ShowB"])).await.unwrap();

        let broker = MemoryBroker::new();
        let (mut monitor, _tx) = monitor(
            dir.path(),
            &broker,
            ScriptedCleaner::failing(&["bad\nname.mkv"]),
            Duration::from_secs(5),
        );

        let first = monitor.run_cycle().await.unwrap();
        let second = monitor.run_cycle().await.unwrap();

        assert_eq!(first.reported, set(&["bad\\nname.mkv"]));
        assert!(second.reported.is_empty());
        assert_eq!(
            broker.published("cleanvid/error"),
            vec![r#"["bad\\nname.mkv"]"#]
        );
        assert_eq!(
            store.load(SetName::ReportedErrors).await.unwrap(),
            set(&["bad\\nname.mkv"])
        );
    }

    #[tokio::test]
    async fn test_unreachable_broker_keeps_state() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("ShowA")).unwrap();
        std::fs::create_dir(dir.path().join("ShowB")).unwrap();
        let store = StateStore::new(dir.path());
        store.save(SetName::Known, &set(&["ShowA"])).await.unwrap();
        store.save(SetName::Approved, &set(&["ShowA"])).await.unwrap();

        let broker = MemoryBroker::new();
        broker.set_unavailable(true);
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        let report = monitor.run_cycle().await.unwrap();

        assert_eq!(report.discovered, set(&["ShowB"]));
        assert!(report.approval.is_none());
        assert_eq!(store.load(SetName::Approved).await.unwrap(), set(&["ShowA"]));
        assert_eq!(store.load(SetName::Known).await.unwrap(), set(&["ShowA"]));

        // Announced again once the broker is back.
        broker.set_unavailable(false);
        let responder = approve_next(&broker, r#"["ShowB"]"#).await;
        let report = monitor.run_cycle().await.unwrap();
        responder.await.unwrap();

        assert_eq!(report.approval, Some(Approval::Approved(set(&["ShowB"]))));
        assert_eq!(store.load(SetName::Approved).await.unwrap(), set(&["ShowA", "ShowB"]));
    }

    #[tokio::test]
    async fn test_approval_timeout_keeps_approved() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("ShowB")).unwrap();
        let store = StateStore::new(dir.path());

        let broker = MemoryBroker::new();
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_millis(50));

        let report = monitor.run_cycle().await.unwrap();

        assert_eq!(report.approval, Some(Approval::TimedOut));
        assert_eq!(store.load(SetName::Known).await.unwrap(), set(&["ShowB"]));
        assert!(store.load(SetName::Approved).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_approved_names_are_dropped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("ShowB")).unwrap();
        let store = StateStore::new(dir.path());

        let broker = MemoryBroker::new();
        let responder = approve_next(&broker, r#"["ShowB", "../etc", ""]"#).await;
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        monitor.run_cycle().await.unwrap();
        responder.await.unwrap();

        assert_eq!(store.load(SetName::Approved).await.unwrap(), set(&["ShowB"]));
    }

    #[tokio::test]
    async fn test_corrupted_state_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cleaning.txt"), "ShowA\nbad/name\n").unwrap();

        let broker = MemoryBroker::new();
        let (mut monitor, _tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        let err = monitor.run_cycle().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let broker = MemoryBroker::new();
        let (monitor, tx) = monitor(dir.path(), &broker, ScriptedCleaner::new(), Duration::from_secs(5));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), monitor.run())
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
