//! Crash-safe persisted name sets.
//!
//! This crate provides:
//! - Loading sorted, newline-delimited set files (missing file = empty set)
//! - Atomic saves via write-to-temp then rename
//! - Strict parsing that rejects corrupted state instead of guessing

pub mod error;
pub mod store;

pub use error::{StateError, StateResult};
pub use store::StateStore;
