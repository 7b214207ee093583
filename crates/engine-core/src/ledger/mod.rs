use crate::error::LedgerError;
use async_trait::async_trait;
use model::{
    core::value::Value,
    sync::ledger::{EntryId, LedgerEntry, SyncStatus},
};
use std::collections::{HashMap, HashSet};

pub mod postgres;

pub const LEDGER_TABLE: &str = "sync_log";

/// Durable per-table history of sync attempts.
///
/// None of these calls share a transaction with the table data, so a crash
/// mid-table leaves the attempt `in_progress` or `failed`, never `completed`.
#[async_trait]
pub trait SyncLedger: Send + Sync {
    /// Creates the ledger table when it does not exist yet.
    async fn ensure_schema(&self) -> Result<(), LedgerError>;

    /// Watermark of the most recently completed attempt for `table`.
    /// `None` means the next attempt is a full sync.
    async fn last_completed_watermark(&self, table: &str) -> Result<Option<Value>, LedgerError>;

    async fn start_entry(&self, table: &str, watermark: &Value) -> Result<EntryId, LedgerError>;

    async fn finish_entry(
        &self,
        id: EntryId,
        rows_synced: i64,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> Result<(), LedgerError>;

    /// Newest entries first, optionally for one table only.
    async fn recent_entries(
        &self,
        table: Option<&str>,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;
}

/// `in_progress` entries that a later terminal entry of the same table has
/// superseded. Those attempts were interrupted and will never finish.
pub fn stale_entries(entries: &[LedgerEntry]) -> HashSet<EntryId> {
    let mut latest_terminal: HashMap<&str, EntryId> = HashMap::new();
    for entry in entries.iter().filter(|e| e.status.is_terminal()) {
        let latest = latest_terminal.entry(entry.table_name.as_str()).or_insert(entry.id);
        *latest = (*latest).max(entry.id);
    }

    entries
        .iter()
        .filter(|e| e.status == SyncStatus::InProgress)
        .filter(|e| {
            latest_terminal
                .get(e.table_name.as_str())
                .is_some_and(|&terminal| terminal > e.id)
        })
        .map(|e| e.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: EntryId, table: &str, status: SyncStatus) -> LedgerEntry {
        LedgerEntry {
            id,
            table_name: table.to_string(),
            status,
            last_sync_timestamp: None,
            sync_completed_at: None,
            rows_synced: 0,
            error_message: None,
        }
    }

    #[test]
    fn test_superseded_in_progress_entries_are_stale() {
        let entries = vec![
            entry(5, "User", SyncStatus::InProgress),
            entry(4, "Image", SyncStatus::Completed),
            entry(3, "User", SyncStatus::Failed),
            entry(2, "User", SyncStatus::InProgress),
            entry(1, "Image", SyncStatus::InProgress),
        ];

        let stale = stale_entries(&entries);
        assert_eq!(stale, HashSet::from([2, 1]));
    }
}
