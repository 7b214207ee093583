use crate::error::SyncError;
use connectors::sql::base::{
    adapter::{SourceAdapter, WriteTransaction},
    requests::PlaceholderRequest,
};
use model::sync::{catalog::Catalog, table::TableSpec};
use serde::Serialize;
use tracing::{debug, warn};

/// Key column assumed for referenced tables outside the catalog.
pub const DEFAULT_KEY_COLUMN: &str = "id";

/// Stub rows carry only their key plus these, set to the current time.
pub const PLACEHOLDER_TIMESTAMP_COLUMNS: [&str; 2] = ["createdAt", "updatedAt"];

/// What happened for one FK column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlaceholderOutcome {
    /// Stubs were inserted; `rows` excludes ids that already existed.
    Created { rows: u64 },
    /// The referenced table already holds data and is left alone.
    SkippedPopulated,
    /// The column has no entry in the FK map.
    SkippedUnmapped,
    /// The source column holds no non-null values.
    NoValues,
    /// Best-effort insert failed; the transaction is still usable.
    InsertFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnPlaceholders {
    pub column: String,
    pub referenced_table: Option<String>,
    #[serde(flatten)]
    pub outcome: PlaceholderOutcome,
}

/// Ensures every FK value a table is about to reference exists in the
/// referenced destination table, at least as a stub row.
pub struct FkPlaceholderResolver<'a> {
    source: &'a dyn SourceAdapter,
    catalog: &'a Catalog,
}

impl<'a> FkPlaceholderResolver<'a> {
    pub fn new(source: &'a dyn SourceAdapter, catalog: &'a Catalog) -> Self {
        Self { source, catalog }
    }

    /// Resolves every FK column of `spec`, in declaration order.
    pub async fn resolve(
        &self,
        tx: &mut dyn WriteTransaction,
        spec: &TableSpec,
    ) -> Result<Vec<ColumnPlaceholders>, SyncError> {
        let mut results = Vec::with_capacity(spec.fk_columns.len());
        for column in &spec.fk_columns {
            let outcome = self.resolve_column(tx, &spec.name, column).await?;
            results.push(ColumnPlaceholders {
                column: column.clone(),
                referenced_table: self.catalog.referenced_table(column).map(str::to_string),
                outcome,
            });
        }
        Ok(results)
    }

    /// Only reading the source values can fail; destination-side problems
    /// are reported as [`PlaceholderOutcome::InsertFailed`].
    pub async fn resolve_column(
        &self,
        tx: &mut dyn WriteTransaction,
        table: &str,
        column: &str,
    ) -> Result<PlaceholderOutcome, SyncError> {
        let Some(referenced) = self.catalog.referenced_table(column) else {
            debug!("No FK mapping for {table}.{column}; trusting destination constraint");
            return Ok(PlaceholderOutcome::SkippedUnmapped);
        };

        match tx.has_rows(referenced).await {
            Ok(true) => {
                debug!("{referenced} already populated; skipping placeholders for {table}.{column}");
                return Ok(PlaceholderOutcome::SkippedPopulated);
            }
            Ok(false) => {}
            Err(err) => return Ok(insert_failed(table, column, referenced, err.to_string())),
        }

        let ids = self.source.distinct_values(table, column).await?;
        if ids.is_empty() {
            return Ok(PlaceholderOutcome::NoValues);
        }

        let key_column = self
            .catalog
            .table(referenced)
            .map_or(DEFAULT_KEY_COLUMN, |spec| spec.primary_key.as_str());
        let request = PlaceholderRequest {
            table: referenced.to_string(),
            key_column: key_column.to_string(),
            timestamp_columns: PLACEHOLDER_TIMESTAMP_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            ids,
        };

        match tx.insert_placeholders(&request).await {
            Ok(rows) => {
                if rows > 0 {
                    debug!("Created {rows} placeholder(s) in {referenced} for {table}.{column}");
                }
                Ok(PlaceholderOutcome::Created { rows })
            }
            Err(err) => Ok(insert_failed(table, column, referenced, err.to_string())),
        }
    }
}

fn insert_failed(table: &str, column: &str, referenced: &str, message: String) -> PlaceholderOutcome {
    warn!("Could not create placeholders in {referenced} for {table}.{column}: {message}");
    PlaceholderOutcome::InsertFailed { message }
}
