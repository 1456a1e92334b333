//! Pub/sub topic naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordination channels, relative to the configured topic prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Newly discovered units (published)
    Found,
    /// Units approved for cleaning (consumed)
    ToClean,
    /// File names that failed to clean (published)
    Error,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Found => "found",
            Channel::ToClean => "to_clean",
            Channel::Error => "error",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolves channels to full topic names under a prefix, e.g. `cleanvid/found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full topic name for a channel.
    pub fn topic(&self, channel: Channel) -> String {
        format!("{}/{}", self.prefix, channel.as_str())
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new("cleanvid")
    }
}
