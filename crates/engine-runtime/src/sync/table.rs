use crate::{
    error::SyncError,
    sync::placeholders::{ColumnPlaceholders, FkPlaceholderResolver},
};
use connectors::sql::base::{
    adapter::{DestinationAdapter, SourceAdapter, WriteTransaction},
    requests::{FetchRowsRequest, SoftDeletedRowsRequest},
};
use engine_core::ledger::SyncLedger;
use model::{
    core::value::Value,
    sync::{catalog::Catalog, ledger::SyncStatus, table::TableSpec},
};
use serde::Serialize;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSyncReport {
    pub table: String,
    pub rows_synced: u64,
    /// Destination rows whose deletion timestamp was refreshed.
    pub soft_deleted: u64,
    pub placeholders: Vec<ColumnPlaceholders>,
}

/// Work done inside the destination transaction.
struct Applied {
    rows_synced: u64,
    soft_deleted: u64,
    placeholders: Vec<ColumnPlaceholders>,
}

/// Synchronises one table: watermark bookkeeping in the ledger around a
/// single destination transaction holding placeholders, UPSERTs and
/// soft-delete updates.
pub struct TableSyncer<'a> {
    source: &'a dyn SourceAdapter,
    destination: &'a dyn DestinationAdapter,
    ledger: &'a dyn SyncLedger,
    catalog: &'a Catalog,
    batch_size: usize,
}

impl<'a> TableSyncer<'a> {
    pub fn new(
        source: &'a dyn SourceAdapter,
        destination: &'a dyn DestinationAdapter,
        ledger: &'a dyn SyncLedger,
        catalog: &'a Catalog,
    ) -> Self {
        Self {
            source,
            destination,
            ledger,
            catalog,
            batch_size: 1000,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn sync(&self, spec: &TableSpec) -> Result<TableSyncReport, SyncError> {
        info!("Starting sync for table: {}", spec.name);

        let last_watermark = self.ledger.last_completed_watermark(&spec.name).await?;

        // Captured before extraction so rows written mid-run are picked up next time.
        let source_max = self
            .source
            .max_value(&spec.name, &spec.watermark_column)
            .await?;
        let watermark = if source_max.is_null() {
            last_watermark.clone().unwrap_or(Value::Null)
        } else {
            source_max
        };

        let entry_id = self.ledger.start_entry(&spec.name, &watermark).await?;

        let result = self.apply(spec, last_watermark).await;
        match result {
            Ok(applied) => {
                let rows = i64::try_from(applied.rows_synced).unwrap_or(i64::MAX);
                if let Err(err) = self
                    .ledger
                    .finish_entry(entry_id, rows, SyncStatus::Completed, None)
                    .await
                {
                    error!(table = %spec.name, "Failed to mark ledger entry {entry_id} completed: {err}");
                }

                info!("Successfully synced {} records to {}", applied.rows_synced, spec.name);
                Ok(TableSyncReport {
                    table: spec.name.clone(),
                    rows_synced: applied.rows_synced,
                    soft_deleted: applied.soft_deleted,
                    placeholders: applied.placeholders,
                })
            }
            Err(err) => {
                let message = err.to_string();
                if let Err(ledger_err) = self
                    .ledger
                    .finish_entry(entry_id, 0, SyncStatus::Failed, Some(&message))
                    .await
                {
                    error!(table = %spec.name, "Failed to mark ledger entry {entry_id} failed: {ledger_err}");
                }

                error!(table = %spec.name, "Failed to sync {}: {message}", spec.name);
                Err(err)
            }
        }
    }

    /// Runs the transactional part; commits on success, rolls back otherwise.
    async fn apply(
        &self,
        spec: &TableSpec,
        last_watermark: Option<Value>,
    ) -> Result<Applied, SyncError> {
        let mut tx = self.destination.begin().await?;

        let result = self.apply_in(tx.as_mut(), spec, last_watermark).await;
        match result {
            Ok(applied) => {
                tx.commit().await?;
                Ok(applied)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(table = %spec.name, "Rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    async fn apply_in(
        &self,
        tx: &mut dyn WriteTransaction,
        spec: &TableSpec,
        last_watermark: Option<Value>,
    ) -> Result<Applied, SyncError> {
        let placeholders = if spec.fk_columns.is_empty() {
            Vec::new()
        } else {
            FkPlaceholderResolver::new(self.source, self.catalog)
                .resolve(tx, spec)
                .await?
        };

        match &last_watermark {
            Some(since) => debug!("Incremental sync of {} from {since}", spec.name),
            None => debug!("Full sync of {} (no previous sync found)", spec.name),
        }

        let request = FetchRowsRequest::for_table(spec, last_watermark.clone());
        let rows = self.source.fetch_rows(&request).await?;

        if rows.is_empty() {
            info!("No new records to sync for {}", spec.name);
            return Ok(Applied {
                rows_synced: 0,
                soft_deleted: 0,
                placeholders,
            });
        }

        info!("Found {} records to sync for {}", rows.len(), spec.name);

        let total = rows.len();
        for (batch_idx, batch) in rows.chunks(self.batch_size).enumerate() {
            for row in batch {
                tx.upsert_row(spec, row).await?;
            }
            let done = (batch_idx * self.batch_size + batch.len()).min(total);
            debug!("Synced {done}/{total} records for {}", spec.name);
        }

        let soft_deleted = match SoftDeletedRowsRequest::for_table(spec, last_watermark) {
            Some(request) => self.apply_soft_deletes(tx, &request).await?,
            None => 0,
        };

        Ok(Applied {
            rows_synced: total as u64,
            soft_deleted,
            placeholders,
        })
    }

    /// Copies source deletion timestamps onto the matching destination rows.
    async fn apply_soft_deletes(
        &self,
        tx: &mut dyn WriteTransaction,
        request: &SoftDeletedRowsRequest,
    ) -> Result<u64, SyncError> {
        let deleted = self.source.soft_deleted_rows(request).await?;

        let mut updated = 0;
        for row in &deleted {
            updated += tx
                .mark_deleted(
                    &request.table,
                    &request.primary_key,
                    &request.deleted_column,
                    &row.get_value(&request.primary_key),
                    &row.get_value(&request.deleted_column),
                )
                .await?;
        }

        if updated > 0 {
            info!("Updated {updated} soft-deleted records in {}", request.table);
        }
        Ok(updated)
    }
}
