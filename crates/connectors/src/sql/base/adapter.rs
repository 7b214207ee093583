use crate::sql::base::{
    error::DbError,
    requests::{FetchRowsRequest, PlaceholderRequest, SoftDeletedRowsRequest},
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::RowData, sync::table::TableSpec};

/// Read-only access to the system of record.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Current maximum of `column`; `Value::Null` for an empty table.
    async fn max_value(&self, table: &str, column: &str) -> Result<Value, DbError>;

    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError>;

    /// Distinct non-null values of `column` over the whole table.
    async fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<Value>, DbError>;

    /// Rows carrying a deletion timestamp, as `(primary key, deleted column)` pairs.
    async fn soft_deleted_rows(
        &self,
        request: &SoftDeletedRowsRequest,
    ) -> Result<Vec<RowData>, DbError>;
}

#[async_trait]
pub trait DestinationAdapter: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn WriteTransaction>, DbError>;
}

/// One open destination transaction. Nothing is visible to other sessions
/// until [`WriteTransaction::commit`].
#[async_trait]
pub trait WriteTransaction: Send {
    async fn has_rows(&mut self, table: &str) -> Result<bool, DbError>;

    /// Insert-or-ignore of stub rows. A failure leaves the transaction usable.
    async fn insert_placeholders(&mut self, request: &PlaceholderRequest) -> Result<u64, DbError>;

    async fn upsert_row(&mut self, spec: &TableSpec, row: &RowData) -> Result<(), DbError>;

    async fn mark_deleted(
        &mut self,
        table: &str,
        primary_key: &str,
        deleted_column: &str,
        id: &Value,
        deleted_at: &Value,
    ) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}
