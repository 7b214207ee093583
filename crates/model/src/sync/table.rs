use serde::Serialize;

/// Static description of one replicated table.
///
/// Descriptors are built once, at startup, and consumed in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub name: String,
    /// Monotonic column used as the incremental cursor.
    pub watermark_column: String,
    /// Columns transferred, in insert order.
    pub columns: Vec<String>,
    pub primary_key: String,
    /// Nullable deletion-timestamp column, when soft deletes are propagated.
    pub soft_delete_column: Option<String>,
    /// Columns holding foreign keys into other tables.
    pub fk_columns: Vec<String>,
    /// Extra SQL predicate restricting eligible source rows.
    pub source_filter: Option<String>,
}

impl TableSpec {
    pub fn builder(name: &str) -> TableSpecBuilder {
        TableSpecBuilder::new(name)
    }

    pub fn has_soft_delete(&self) -> bool {
        self.soft_delete_column.is_some()
    }

    /// Every transferred column except the primary key.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &String> {
        self.columns.iter().filter(move |c| **c != self.primary_key)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

pub struct TableSpecBuilder {
    name: String,
    watermark_column: String,
    columns: Vec<String>,
    primary_key: String,
    soft_delete_column: Option<String>,
    fk_columns: Vec<String>,
    source_filter: Option<String>,
}

impl TableSpecBuilder {
    pub fn new(name: &str) -> Self {
        TableSpecBuilder {
            name: name.to_string(),
            watermark_column: "updatedAt".to_string(),
            columns: Vec::new(),
            primary_key: "id".to_string(),
            soft_delete_column: None,
            fk_columns: Vec::new(),
            source_filter: None,
        }
    }

    pub fn watermark(mut self, column: &str) -> Self {
        self.watermark_column = column.to_string();
        self
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    pub fn soft_delete(mut self, column: &str) -> Self {
        self.soft_delete_column = Some(column.to_string());
        self
    }

    pub fn fk_columns(mut self, columns: &[&str]) -> Self {
        self.fk_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn source_filter(mut self, predicate: &str) -> Self {
        self.source_filter = Some(predicate.trim().to_string());
        self
    }

    pub fn build(self) -> TableSpec {
        TableSpec {
            name: self.name,
            watermark_column: self.watermark_column,
            columns: self.columns,
            primary_key: self.primary_key,
            soft_delete_column: self.soft_delete_column,
            fk_columns: self.fk_columns,
            source_filter: self.source_filter,
        }
    }
}
