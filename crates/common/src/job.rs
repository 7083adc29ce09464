//! Export job identity.
//!
//! Every export request gets a [`JobId`] that names its scratch directory
//! and tags its log events. Ids are unique within a process and sort by
//! creation time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifier of a single export request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocate a fresh id anchored to the current wall clock.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Allocate an id for a known timestamp.
    pub fn at(now: DateTime<Utc>) -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}-{:04x}{:04x}",
            now.format("%Y%m%dT%H%M%S%3f"),
            std::process::id() & 0xFFFF,
            seq & 0xFFFF
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ids_are_unique() {
        let now = Utc::now();
        let a = JobId::at(now);
        let b = JobId::at(now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_is_filesystem_safe() {
        let id = JobId::at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap());
        assert!(id.as_str().starts_with("20240301T123005000-"));
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }
}
