//! Backup identifiers for full-collection snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a full-collection backup, unique per store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(String);

impl BackupId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Backup name derived from a unix timestamp and a per-store sequence.
    pub fn at(unix_secs: u64, seq: u64) -> Self {
        Self(format!("users_backup_{unix_secs}_{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata about a stored backup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: BackupId,
    /// Unix seconds when the snapshot was taken.
    pub created_at: u64,
    /// Number of records copied.
    pub records: u64,
}
