//! Shared data models for the cleanvid monitor.
//!
//! This crate provides Serde-serializable types for:
//! - Sorted name sets (units, reported file names)
//! - The persisted set names
//! - Pub/sub topic naming
//! - File eligibility and the cleaned-output naming convention

pub mod file_task;
pub mod name_set;
pub mod set_name;
pub mod topic;

// Re-export common types
pub use file_task::{
    cleaned_output_path, is_cleaned, is_eligible, is_hidden, is_subtitle, FileTask, CLEAN_MARKER,
    SUBTITLE_EXTENSIONS,
};
pub use name_set::{check_name, NameSet};
pub use set_name::SetName;
pub use topic::{Channel, Topics};
