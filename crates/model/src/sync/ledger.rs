use crate::core::value::Value;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Identifier of a ledger row.
pub type EntryId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    InProgress,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncStatus::InProgress)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SyncStatus::InProgress),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(format!("Unknown sync status: {other}")),
        }
    }
}

/// One sync attempt for one table, as recorded in `sync_log`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub table_name: String,
    pub status: SyncStatus,
    /// Watermark captured before extraction for this attempt.
    pub last_sync_timestamp: Option<Value>,
    pub sync_completed_at: Option<DateTime<Utc>>,
    pub rows_synced: i64,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [SyncStatus::InProgress, SyncStatus::Completed, SyncStatus::Failed] {
            assert_eq!(status.as_str().parse::<SyncStatus>(), Ok(status));
        }
        assert!("done".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_only_in_progress_is_not_terminal() {
        assert!(!SyncStatus::InProgress.is_terminal());
        assert!(SyncStatus::Completed.is_terminal());
        assert!(SyncStatus::Failed.is_terminal());
    }
}
