//! In-memory stand-ins for the source, destination and ledger, so the sync
//! engine can be exercised without a database.

use async_trait::async_trait;
use chrono::Utc;
use connectors::sql::base::{
    adapter::{DestinationAdapter, SourceAdapter, WriteTransaction},
    error::DbError,
    requests::{FetchRowsRequest, PlaceholderRequest, SoftDeletedRowsRequest},
};
use engine_core::{error::LedgerError, ledger::SyncLedger};
use model::{
    core::value::Value,
    records::row::RowData,
    sync::{
        ledger::{EntryId, LedgerEntry, SyncStatus},
        table::TableSpec,
    },
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex},
};

/// Stands in for a table's SQL row filter.
pub type RowFilter = Arc<dyn Fn(&RowData) -> bool + Send + Sync>;

type Tables = HashMap<String, BTreeMap<String, RowData>>;

fn injected(what: &str, table: &str) -> DbError {
    DbError::Unknown(format!("injected {what} failure for {table}"))
}

fn key_of(value: &Value) -> String {
    value.to_string()
}

fn sort_by_column(rows: &mut [RowData], column: &str) {
    rows.sort_by(|a, b| {
        a.get_value(column)
            .compare(&b.get_value(column))
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Default)]
pub struct MemorySource {
    tables: Mutex<HashMap<String, Vec<RowData>>>,
    filters: Mutex<HashMap<String, RowFilter>>,
    failing: Mutex<HashSet<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: RowData) {
        self.tables
            .lock()
            .unwrap()
            .entry(row.entity.clone())
            .or_default()
            .push(row);
    }

    /// Replaces the row of `table` whose `key` column equals the new row's.
    pub fn update(&self, key: &str, row: RowData) {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(row.entity.clone()).or_default();
        let id = row.get_value(key);
        rows.retain(|existing| existing.get_value(key) != id);
        rows.push(row);
    }

    pub fn with_filter<F>(self, table: &str, filter: F) -> Self
    where
        F: Fn(&RowData) -> bool + Send + Sync + 'static,
    {
        self.filters
            .lock()
            .unwrap()
            .insert(table.to_string(), Arc::new(filter));
        self
    }

    /// Every read of `table` fails until [`MemorySource::heal`].
    pub fn fail_reads(&self, table: &str) {
        self.failing.lock().unwrap().insert(table.to_string());
    }

    pub fn heal(&self, table: &str) {
        self.failing.lock().unwrap().remove(table);
    }

    fn check(&self, table: &str) -> Result<(), DbError> {
        if self.failing.lock().unwrap().contains(table) {
            return Err(injected("read", table));
        }
        Ok(())
    }

    fn rows(&self, table: &str) -> Vec<RowData> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceAdapter for MemorySource {
    async fn max_value(&self, table: &str, column: &str) -> Result<Value, DbError> {
        self.check(table)?;
        let max = self
            .rows(table)
            .iter()
            .map(|row| row.get_value(column))
            .filter(|value| !value.is_null())
            .fold(Value::Null, |max, value| {
                if max.is_null() || value.is_after(&max) {
                    value
                } else {
                    max
                }
            });
        Ok(max)
    }

    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        self.check(&request.table)?;
        let filter = self.filters.lock().unwrap().get(&request.table).cloned();

        let mut rows: Vec<RowData> = self
            .rows(&request.table)
            .into_iter()
            .filter(|row| filter.as_ref().is_none_or(|f| f(row)))
            .filter(|row| match &request.since {
                Some(since) => row.get_value(&request.watermark_column).is_after(since),
                None => true,
            })
            .map(|row| {
                let values = row.values_for(&request.columns);
                RowData::from_pairs(&request.table, request.columns.iter().zip(values))
            })
            .collect();
        sort_by_column(&mut rows, &request.watermark_column);
        Ok(rows)
    }

    async fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<Value>, DbError> {
        self.check(table)?;
        let mut values: Vec<Value> = Vec::new();
        for value in self.rows(table).iter().map(|row| row.get_value(column)) {
            if !value.is_null() && !values.contains(&value) {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn soft_deleted_rows(
        &self,
        request: &SoftDeletedRowsRequest,
    ) -> Result<Vec<RowData>, DbError> {
        self.check(&request.table)?;
        let rows = self
            .rows(&request.table)
            .into_iter()
            .filter(|row| {
                let deleted = row.get_value(&request.deleted_column);
                !deleted.is_null()
                    && request.since.as_ref().is_none_or(|since| deleted.is_after(since))
            })
            .map(|row| {
                RowData::from_pairs(
                    &request.table,
                    [
                        (&request.primary_key, row.get_value(&request.primary_key)),
                        (&request.deleted_column, row.get_value(&request.deleted_column)),
                    ],
                )
            })
            .collect();
        Ok(rows)
    }
}

/// `(table, column, referenced table)`; the referenced key is its primary key.
type ForeignKey = (String, String, String);

#[derive(Default)]
struct DestinationState {
    tables: Tables,
    foreign_keys: Vec<ForeignKey>,
    failing_upserts: HashSet<String>,
    failing_placeholders: HashSet<String>,
    commits: usize,
    rollbacks: usize,
}

/// Destination holding committed tables; a transaction works on a copy and
/// publishes it on commit.
#[derive(Clone, Default)]
pub struct MemoryDestination {
    state: Arc<Mutex<DestinationState>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `tables` exist, empty. Touching any other table fails.
    pub fn with_tables(self, tables: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for table in tables {
                state.tables.entry(table.to_string()).or_default();
            }
        }
        self
    }

    /// Rejects upserts into `table` whose `column` names a missing
    /// `referenced` row, as a destination FK constraint would.
    pub fn with_foreign_key(self, table: &str, column: &str, referenced: &str) -> Self {
        self.state.lock().unwrap().foreign_keys.push((
            table.to_string(),
            column.to_string(),
            referenced.to_string(),
        ));
        self
    }

    pub fn fail_upserts(&self, table: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_upserts
            .insert(table.to_string());
    }

    pub fn heal_upserts(&self, table: &str) {
        self.state.lock().unwrap().failing_upserts.remove(table);
    }

    pub fn fail_placeholders(&self, table: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_placeholders
            .insert(table.to_string());
    }

    /// Committed rows of `table`, ordered by primary key text.
    pub fn rows(&self, table: &str) -> Vec<RowData> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row(&self, table: &str, id: &Value) -> Option<RowData> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .and_then(|rows| rows.get(&key_of(id)).cloned())
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }
}

#[async_trait]
impl DestinationAdapter for MemoryDestination {
    async fn begin(&self) -> Result<Box<dyn WriteTransaction>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(Box::new(MemoryTransaction {
            working: state.tables.clone(),
            foreign_keys: state.foreign_keys.clone(),
            failing_upserts: state.failing_upserts.clone(),
            failing_placeholders: state.failing_placeholders.clone(),
            shared: Arc::clone(&self.state),
        }))
    }
}

pub struct MemoryTransaction {
    working: Tables,
    foreign_keys: Vec<ForeignKey>,
    failing_upserts: HashSet<String>,
    failing_placeholders: HashSet<String>,
    shared: Arc<Mutex<DestinationState>>,
}

impl MemoryTransaction {
    fn table_mut(&mut self, table: &str) -> Result<&mut BTreeMap<String, RowData>, DbError> {
        self.working
            .get_mut(table)
            .ok_or_else(|| DbError::Unknown(format!("relation \"{table}\" does not exist")))
    }

    fn check_foreign_keys(&self, table: &str, row: &RowData) -> Result<(), DbError> {
        for (_, column, referenced) in self.foreign_keys.iter().filter(|fk| fk.0 == table) {
            let value = row.get_value(column);
            if value.is_null() {
                continue;
            }
            let exists = self
                .working
                .get(referenced)
                .is_some_and(|rows| rows.contains_key(&key_of(&value)));
            if !exists {
                return Err(DbError::Unknown(format!(
                    "insert or update on table \"{table}\" violates foreign key constraint: \
                     {column}={value} is not present in table \"{referenced}\""
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WriteTransaction for MemoryTransaction {
    async fn has_rows(&mut self, table: &str) -> Result<bool, DbError> {
        Ok(!self.table_mut(table)?.is_empty())
    }

    async fn insert_placeholders(&mut self, request: &PlaceholderRequest) -> Result<u64, DbError> {
        if self.failing_placeholders.contains(&request.table) {
            return Err(injected("placeholder", &request.table));
        }

        let now = Value::Timestamp(Utc::now());
        let rows = self.table_mut(&request.table)?;
        let mut inserted = 0;
        for id in &request.ids {
            let key = key_of(id);
            if rows.contains_key(&key) {
                continue;
            }
            let mut stub = RowData::from_pairs(&request.table, [(&request.key_column, id.clone())]);
            for column in &request.timestamp_columns {
                stub.set(column, now.clone());
            }
            rows.insert(key, stub);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn upsert_row(&mut self, spec: &TableSpec, row: &RowData) -> Result<(), DbError> {
        if self.failing_upserts.contains(&spec.name) {
            return Err(injected("upsert", &spec.name));
        }
        self.check_foreign_keys(&spec.name, row)?;

        let key = key_of(&row.get_value(&spec.primary_key));
        let rows = self.table_mut(&spec.name)?;
        match rows.get_mut(&key) {
            Some(existing) => {
                for column in &spec.columns {
                    existing.set(column, row.get_value(column));
                }
            }
            None => {
                let values = row.values_for(&spec.columns);
                rows.insert(key, RowData::from_pairs(&spec.name, spec.columns.iter().zip(values)));
            }
        }
        Ok(())
    }

    async fn mark_deleted(
        &mut self,
        table: &str,
        _primary_key: &str,
        deleted_column: &str,
        id: &Value,
        deleted_at: &Value,
    ) -> Result<u64, DbError> {
        let rows = self.table_mut(table)?;
        match rows.get_mut(&key_of(id)) {
            Some(row) => {
                row.set(deleted_column, deleted_at.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let this = *self;
        let mut state = this.shared.lock().unwrap();
        state.tables = this.working;
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.shared.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn entries_for(&self, table: &str) -> Vec<LedgerEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.table_name == table)
            .collect()
    }
}

#[async_trait]
impl SyncLedger for MemoryLedger {
    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn last_completed_watermark(&self, table: &str) -> Result<Option<Value>, LedgerError> {
        let entries = self.entries.lock().unwrap();
        let latest = entries
            .iter()
            .filter(|e| e.table_name == table && e.status == SyncStatus::Completed)
            .max_by_key(|e| (e.sync_completed_at, e.id));
        Ok(latest.and_then(|e| e.last_sync_timestamp.clone()))
    }

    async fn start_entry(&self, table: &str, watermark: &Value) -> Result<EntryId, LedgerError> {
        let mut entries = self.entries.lock().unwrap();
        let id = entries.len() as EntryId + 1;
        entries.push(LedgerEntry {
            id,
            table_name: table.to_string(),
            status: SyncStatus::InProgress,
            last_sync_timestamp: (!watermark.is_null()).then(|| watermark.clone()),
            sync_completed_at: None,
            rows_synced: 0,
            error_message: None,
        });
        Ok(id)
    }

    async fn finish_entry(
        &self,
        id: EntryId,
        rows_synced: i64,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(LedgerError::MissingEntry(id))?;
        entry.status = status;
        entry.rows_synced = rows_synced;
        entry.error_message = error_message.map(str::to_string);
        entry.sync_completed_at = Some(Utc::now());
        Ok(())
    }

    async fn recent_entries(
        &self,
        table: Option<&str>,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .rev()
            .filter(|e| table.is_none_or(|t| e.table_name == t))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
