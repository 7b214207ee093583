use model::{core::value::Value, sync::table::TableSpec};

/// Incremental extraction of one table: every row whose watermark is
/// strictly after `since`, in ascending watermark order.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRowsRequest {
    pub table: String,
    pub columns: Vec<String>,
    pub watermark_column: String,
    pub since: Option<Value>,
    pub filter: Option<String>,
}

impl FetchRowsRequest {
    pub fn for_table(spec: &TableSpec, since: Option<Value>) -> Self {
        FetchRowsRequestBuilder::new(&spec.name)
            .columns(&spec.columns)
            .watermark(&spec.watermark_column)
            .since(since)
            .filter(spec.source_filter.clone())
            .build()
    }
}

pub struct FetchRowsRequestBuilder {
    table: String,
    columns: Vec<String>,
    watermark_column: String,
    since: Option<Value>,
    filter: Option<String>,
}

impl FetchRowsRequestBuilder {
    pub fn new(table: &str) -> Self {
        FetchRowsRequestBuilder {
            table: table.to_string(),
            columns: Vec::new(),
            watermark_column: String::new(),
            since: None,
            filter: None,
        }
    }

    pub fn columns(mut self, columns: &[String]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    pub fn watermark(mut self, column: &str) -> Self {
        self.watermark_column = column.to_string();
        self
    }

    /// A NULL watermark means a full extraction.
    pub fn since(mut self, since: Option<Value>) -> Self {
        self.since = since.filter(|v| !v.is_null());
        self
    }

    pub fn filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    pub fn build(self) -> FetchRowsRequest {
        FetchRowsRequest {
            table: self.table,
            columns: self.columns,
            watermark_column: self.watermark_column,
            since: self.since,
            filter: self.filter,
        }
    }
}

/// Source rows whose soft-delete column is set, optionally only those
/// deleted after `since`.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftDeletedRowsRequest {
    pub table: String,
    pub primary_key: String,
    pub deleted_column: String,
    pub since: Option<Value>,
}

impl SoftDeletedRowsRequest {
    /// `None` when the table does not propagate soft deletes.
    pub fn for_table(spec: &TableSpec, since: Option<Value>) -> Option<Self> {
        let deleted_column = spec.soft_delete_column.clone()?;
        Some(SoftDeletedRowsRequest {
            table: spec.name.clone(),
            primary_key: spec.primary_key.clone(),
            deleted_column,
            since: since.filter(|v| !v.is_null()),
        })
    }
}

/// Stub rows for the distinct ids an FK column references.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRequest {
    pub table: String,
    pub key_column: String,
    /// Columns stamped with the current time on each stub.
    pub timestamp_columns: Vec<String>,
    pub ids: Vec<Value>,
}
