//! Structured per-unit logging.

use tracing::{error, info, warn, Span};

/// Logger carrying the unit name and operation on every line.
#[derive(Debug, Clone)]
pub struct UnitLogger {
    unit: String,
    operation: String,
}

impl UnitLogger {
    /// Create a logger for `unit` doing `operation` (e.g. "clean").
    pub fn new(unit: &str, operation: &str) -> Self {
        Self {
            unit: unit.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            unit = %self.unit,
            operation = %self.operation,
            "Unit started: {}", message
        );
    }

    pub fn log_progress(&self, file: &str, message: &str) {
        info!(
            unit = %self.unit,
            operation = %self.operation,
            file = %file,
            "[{}] {}", file, message
        );
    }

    pub fn log_warning(&self, file: &str, message: &str) {
        warn!(
            unit = %self.unit,
            operation = %self.operation,
            file = %file,
            "[{}] {}", file, message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            unit = %self.unit,
            operation = %self.operation,
            "Unit error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            unit = %self.unit,
            operation = %self.operation,
            "Unit completed: {}", message
        );
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span for everything done on behalf of this unit.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "unit",
            unit = %self.unit,
            operation = %self.operation
        )
    }
}
