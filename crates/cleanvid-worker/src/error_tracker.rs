//! Deduplicated failure reporting.

use tracing::{info, warn};

use cleanvid_models::{check_name, NameSet, SetName};
use cleanvid_queue::{Broker, CoordinationClient};
use cleanvid_state::StateStore;

use crate::error::WorkerResult;
use crate::metrics;

/// Publishes each failing file once, no matter how many cycles it keeps failing.
pub struct ErrorTracker {
    store: StateStore,
}

impl ErrorTracker {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Report the failures not reported before.
    ///
    /// Publishes `failures - reported` and then persists
    /// `reported ∪ failures`. Nothing is persisted when the delta is empty
    /// or the publish fails, so a failed publish is retried next cycle.
    /// Names that could not be stored in the set file are dropped first.
    /// Returns the published delta.
    pub async fn track<B: Broker>(
        &self,
        client: &CoordinationClient<B>,
        failures: &NameSet,
    ) -> WorkerResult<NameSet> {
        let failures = storable(failures);
        if failures.is_empty() {
            return Ok(NameSet::new());
        }

        let reported = self.store.load(SetName::ReportedErrors).await?;
        let delta = failures.difference(&reported);
        if delta.is_empty() {
            info!("All {} failures were reported before", failures.len());
            return Ok(delta);
        }

        client.publish_errors(&delta).await?;
        metrics::record_errors_reported(delta.len());

        self.store
            .save(SetName::ReportedErrors, &reported.union(&failures))
            .await?;

        Ok(delta)
    }
}

fn storable(failures: &NameSet) -> NameSet {
    failures
        .iter()
        .filter(|name| match check_name(name) {
            Ok(()) => true,
            Err(reason) => {
                warn!("Not reporting failure {:?}: {}", name, reason);
                false
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleanvid_models::Topics;
    use cleanvid_queue::{CoordinationConfig, MemoryBroker, RetryConfig};
    use std::time::Duration;
    use tempfile::TempDir;

    fn set(names: &[&str]) -> NameSet {
        names.iter().copied().collect()
    }

    fn client(broker: &MemoryBroker) -> CoordinationClient<MemoryBroker> {
        CoordinationClient::new(
            broker.clone(),
            CoordinationConfig {
                topics: Topics::new("cleanvid"),
                approval_timeout: Duration::from_secs(1),
                retry: RetryConfig::new("test").with_max_retries(0),
            },
        )
    }

    #[tokio::test]
    async fn test_persistent_failure_is_reported_once() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let tracker = ErrorTracker::new(store.clone());
        let broker = MemoryBroker::new();
        let client = client(&broker);

        for _ in 0..5 {
            tracker.track(&client, &set(&["movie.mkv"])).await.unwrap();
        }

        assert_eq!(broker.published("cleanvid/error"), vec![r#"["movie.mkv"]"#]);
        assert_eq!(
            store.load(SetName::ReportedErrors).await.unwrap(),
            set(&["movie.mkv"])
        );
    }

    #[tokio::test]
    async fn test_only_the_delta_is_published() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        store
            .save(SetName::ReportedErrors, &set(&["old.mkv"]))
            .await
            .unwrap();
        let tracker = ErrorTracker::new(store.clone());
        let broker = MemoryBroker::new();

        let delta = tracker
            .track(&client(&broker), &set(&["old.mkv", "new.mkv"]))
            .await
            .unwrap();

        assert_eq!(delta, set(&["new.mkv"]));
        assert_eq!(broker.published("cleanvid/error"), vec![r#"["new.mkv"]"#]);
        assert_eq!(
            store.load(SetName::ReportedErrors).await.unwrap(),
            set(&["new.mkv", "old.mkv"])
        );
    }

    #[tokio::test]
    async fn test_failed_publish_is_retried_next_cycle() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let tracker = ErrorTracker::new(store.clone());
        let broker = MemoryBroker::new();
        let client = client(&broker);

        broker.set_unavailable(true);
        assert!(tracker.track(&client, &set(&["movie.mkv"])).await.is_err());
        assert!(store.load(SetName::ReportedErrors).await.unwrap().is_empty());

        broker.set_unavailable(false);
        let delta = tracker.track(&client, &set(&["movie.mkv"])).await.unwrap();
        assert_eq!(delta, set(&["movie.mkv"]));
        assert_eq!(broker.published("cleanvid/error").len(), 1);
    }

    #[tokio::test]
    async fn test_unstorable_names_are_never_published() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let tracker = ErrorTracker::new(store.clone());
        let broker = MemoryBroker::new();
        let client = client(&broker);

        for _ in 0..2 {
            tracker
                .track(&client, &set(&["ok.mkv", "two\nlines.mkv"]))
                .await
                .unwrap();
        }

        assert_eq!(broker.published("cleanvid/error"), vec![r#"["ok.mkv"]"#]);
        assert_eq!(
            store.load(SetName::ReportedErrors).await.unwrap(),
            set(&["ok.mkv"])
        );
    }

    #[tokio::test]
    async fn test_no_failures_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let broker = MemoryBroker::new();

        let delta = ErrorTracker::new(store.clone())
            .track(&client(&broker), &NameSet::new())
            .await
            .unwrap();

        assert!(delta.is_empty());
        assert!(!store.path(SetName::ReportedErrors).exists());
    }
}
