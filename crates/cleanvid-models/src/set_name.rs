//! Names of the persisted sets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three sets the monitor persists between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetName {
    /// Every unit seen under the watched root so far
    Known,
    /// Units approved for cleaning
    Approved,
    /// File names already published on the error channel
    ReportedErrors,
}

impl SetName {
    /// All persisted sets.
    pub const ALL: [SetName; 3] = [SetName::Known, SetName::Approved, SetName::ReportedErrors];

    /// File name of the set under the state directory.
    ///
    /// These names match existing deployments, so state written by an
    /// earlier monitor is picked up unchanged.
    pub fn file_name(&self) -> &'static str {
        match self {
            SetName::Known => "found.txt",
            SetName::Approved => "cleaning.txt",
            SetName::ReportedErrors => "errors.txt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SetName::Known => "known",
            SetName::Approved => "approved",
            SetName::ReportedErrors => "reported_errors",
        }
    }
}

impl fmt::Display for SetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
