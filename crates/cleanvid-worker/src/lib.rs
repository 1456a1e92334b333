//! Directory monitor for subtitle-driven profanity cleaning.
//!
//! This crate provides:
//! - Unit discovery under the watched root
//! - The approval-gated clean cycle and its control loop
//! - Per-file failure isolation with deduplicated error reporting
//! - Environment configuration, structured logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod error_tracker;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod runner;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testing;

pub use config::MonitorConfig;
pub use error::{WorkerError, WorkerResult};
pub use error_tracker::ErrorTracker;
pub use logging::UnitLogger;
pub use monitor::{CycleReport, Monitor};
pub use runner::{BatchJobRunner, BatchReport};
pub use scanner::{diff_new, scan};
