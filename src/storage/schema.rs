//! Target and history record definitions
//!
//! ## Derived last check
//!
//! A target never stores its own "last checked" timestamp. Every backend
//! derives it from the newest history record of that target, so appending a
//! history record is the only thing that moves a target's next due time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};

/// Identifier assigned by the store when a target is created
pub type TargetId = i64;

/// A registered URL that is polled at a fixed interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,

    /// Absolute URL fetched on every check
    pub url: String,

    /// Seconds between two checks (always > 0 for stored targets)
    pub interval_secs: u32,

    /// `created_at` of the newest history record, `None` if never checked
    pub last_check: Option<DateTime<Utc>>,
}

/// Input for creating a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTarget {
    pub url: String,
    pub interval_secs: u32,
}

impl NewTarget {
    pub fn new(url: impl Into<String>, interval_secs: u32) -> Self {
        Self {
            url: url.into(),
            interval_secs,
        }
    }

    /// Check the target invariants before it is persisted
    ///
    /// A zero interval would make the target due on every tick, and a URL
    /// without scheme or host can never be fetched.
    pub fn validate(&self) -> StorageResult<()> {
        if self.url.is_empty() {
            return Err(StorageError::InvalidTarget("empty URL".to_string()));
        }

        match reqwest::Url::parse(&self.url) {
            Ok(url) if !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()) => {}
            _ => {
                return Err(StorageError::InvalidTarget(format!(
                    "provided URL \"{}\" is invalid",
                    self.url
                )));
            }
        }

        if self.interval_secs == 0 {
            return Err(StorageError::InvalidTarget(
                "interval must be a positive number of seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Result of one completed fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub target_id: TargetId,

    /// Full response body as text
    pub response: String,

    /// Seconds from request start until the body was read
    pub duration_secs: f64,

    pub created_at: DateTime<Utc>,
}
