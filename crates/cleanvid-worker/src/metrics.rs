//! Prometheus metrics for the monitor.
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const CYCLES_TOTAL: &str = "cleanvid_cycles_total";
    pub const UNITS_DISCOVERED_TOTAL: &str = "cleanvid_units_discovered_total";
    pub const FILES_CLEANED_TOTAL: &str = "cleanvid_files_cleaned_total";
    pub const FILES_FAILED_TOTAL: &str = "cleanvid_files_failed_total";
    pub const ERRORS_REPORTED_TOTAL: &str = "cleanvid_errors_reported_total";
    pub const APPROVED_UNITS: &str = "cleanvid_approved_units";
}

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within the tokio runtime.
pub fn init_metrics(addr: &str) -> WorkerResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| WorkerError::config_error(format!("METRICS_ADDR {:?}: {}", addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::Metrics(e.to_string()))
}

pub fn record_cycle() {
    counter!(names::CYCLES_TOTAL).increment(1);
}

pub fn record_units_discovered(count: usize) {
    counter!(names::UNITS_DISCOVERED_TOTAL).increment(count as u64);
}

pub fn record_file_cleaned() {
    counter!(names::FILES_CLEANED_TOTAL).increment(1);
}

/// Record a failed file, labelled with its failure kind.
pub fn record_file_failed(kind: &'static str) {
    counter!(names::FILES_FAILED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_errors_reported(count: usize) {
    counter!(names::ERRORS_REPORTED_TOTAL).increment(count as u64);
}

pub fn set_approved_units(count: usize) {
    gauge!(names::APPROVED_UNITS).set(count as f64);
}
