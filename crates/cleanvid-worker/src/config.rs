//! Monitor configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use cleanvid_models::Topics;
use cleanvid_queue::{BrokerConfig, CoordinationConfig, RetryConfig};
use cleanvid_state::StateStore;

use crate::error::{WorkerError, WorkerResult};

/// Word list file under the watched directory.
pub const WORD_LIST_FILE: &str = "swears.txt";

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Watched root; also holds the state files and the word list
    pub directory: PathBuf,
    /// Minutes between cycles
    pub wait_minutes: f64,
    /// Broker connection
    pub broker: BrokerConfig,
    /// Topic prefix
    pub topic_prefix: String,
    /// Bounded wait for an approval message
    pub approval_timeout: Duration,
    /// Broker retries before a call counts as failed
    pub broker_max_retries: u32,
    /// Subtitle language code
    pub subtitle_language: String,
    /// Per-file FFmpeg timeout
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Prometheus listener address; metrics are off when unset
    pub metrics_addr: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/data"),
            wait_minutes: 60.0,
            broker: BrokerConfig::default(),
            topic_prefix: "cleanvid".to_string(),
            approval_timeout: Duration::from_secs(300), // 5 minutes
            broker_max_retries: 3,
            subtitle_language: "eng".to_string(),
            ffmpeg_timeout_secs: None,
            metrics_addr: None,
        }
    }
}

impl MonitorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            directory: var("DIRECTORY")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            wait_minutes: var("WAIT")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.wait_minutes),
            broker: BrokerConfig::from_lookup(&var),
            topic_prefix: var("BROKER_TOPIC").unwrap_or(defaults.topic_prefix),
            approval_timeout: var("APPROVAL_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.approval_timeout),
            broker_max_retries: var("BROKER_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.broker_max_retries),
            subtitle_language: var("SUBTITLE_LANGUAGE")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.subtitle_language),
            ffmpeg_timeout_secs: var("FFMPEG_TIMEOUT_SECS").and_then(|s| s.parse().ok()),
            metrics_addr: var("METRICS_ADDR").filter(|s| !s.is_empty()),
        }
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if !self.wait_minutes.is_finite() || self.wait_minutes <= 0.0 {
            return Err(WorkerError::config_error(format!(
                "WAIT must be a positive number of minutes, got {}",
                self.wait_minutes
            )));
        }
        if Duration::try_from_secs_f64(self.wait_minutes * 60.0).is_err() {
            return Err(WorkerError::config_error(format!(
                "WAIT is too large: {}",
                self.wait_minutes
            )));
        }
        if self.approval_timeout.is_zero() {
            return Err(WorkerError::config_error(
                "APPROVAL_TIMEOUT_SECS must be greater than zero",
            ));
        }
        if self.topic_prefix.trim_end_matches('/').is_empty() {
            return Err(WorkerError::config_error("BROKER_TOPIC must not be empty"));
        }
        if let Some(addr) = &self.metrics_addr {
            addr.parse::<SocketAddr>().map_err(|e| {
                WorkerError::config_error(format!("METRICS_ADDR {:?} is invalid: {}", addr, e))
            })?;
        }
        Ok(())
    }

    /// Sleep between cycles.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.wait_minutes * 60.0).unwrap_or(Duration::from_secs(3600))
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.directory)
    }

    pub fn word_list_path(&self) -> PathBuf {
        self.directory.join(WORD_LIST_FILE)
    }

    pub fn coordination(&self) -> CoordinationConfig {
        CoordinationConfig {
            topics: Topics::new(self.topic_prefix.clone()),
            approval_timeout: self.approval_timeout,
            retry: RetryConfig::new("broker").with_max_retries(self.broker_max_retries),
        }
    }
}
