use crate::sync::table::TableSpec;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Table `{0}` is declared more than once")]
    DuplicateTable(String),

    #[error("Table `{table}` does not transfer its {role} column `{column}`")]
    MissingColumn {
        table: String,
        role: &'static str,
        column: String,
    },

    #[error("Table `{table}` references `{referenced}` through `{column}`, which is synced later")]
    OrderViolation {
        table: String,
        column: String,
        referenced: String,
    },
}

/// The ordered set of synced tables plus the FK column to referenced table map.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    tables: Vec<TableSpec>,
    foreign_keys: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Catalog {
            tables,
            foreign_keys: BTreeMap::new(),
        }
    }

    pub fn with_foreign_key(mut self, column: &str, referenced_table: &str) -> Self {
        self.foreign_keys
            .insert(column.to_string(), referenced_table.to_string());
        self
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn foreign_keys(&self) -> &BTreeMap<String, String> {
        &self.foreign_keys
    }

    /// Table referenced by an FK column, if the column is mapped at all.
    pub fn referenced_table(&self, column: &str) -> Option<&str> {
        self.foreign_keys.get(column).map(String::as_str)
    }

    /// Checks descriptor consistency and that every referenced synced table
    /// precedes the tables that point at it.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut positions = HashMap::new();
        for (idx, table) in self.tables.iter().enumerate() {
            if positions.insert(table.name.as_str(), idx).is_some() {
                return Err(CatalogError::DuplicateTable(table.name.clone()));
            }
        }

        for (idx, table) in self.tables.iter().enumerate() {
            let mut required = vec![
                ("primary key", &table.primary_key),
                ("watermark", &table.watermark_column),
            ];
            if let Some(column) = &table.soft_delete_column {
                required.push(("soft-delete", column));
            }
            for fk in &table.fk_columns {
                required.push(("foreign key", fk));
            }

            for (role, column) in required {
                if !table.has_column(column) {
                    return Err(CatalogError::MissingColumn {
                        table: table.name.clone(),
                        role,
                        column: column.clone(),
                    });
                }
            }

            for fk in &table.fk_columns {
                let Some(referenced) = self.referenced_table(fk) else {
                    continue;
                };
                if let Some(&ref_idx) = positions.get(referenced)
                    && ref_idx > idx
                {
                    return Err(CatalogError::OrderViolation {
                        table: table.name.clone(),
                        column: fk.clone(),
                        referenced: referenced.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
