use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// One extracted row: column name to value, for a single table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<I, K>(entity: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let field_values = pairs
            .into_iter()
            .map(|(name, value)| FieldValue::new(name.as_ref(), value))
            .collect();
        RowData::new(entity, field_values)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values.iter().find(|f| f.name == field)
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .and_then(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Values for `columns`, in that order. Missing columns read as NULL.
    pub fn values_for(&self, columns: &[String]) -> Vec<Value> {
        columns.iter().map(|c| self.get_value(c)).collect()
    }

    /// Replaces the value of `field`, appending it when absent.
    pub fn set(&mut self, field: &str, value: Value) {
        let updated = FieldValue::new(field, value);
        match self.field_values.iter_mut().find(|f| f.name == field) {
            Some(existing) => *existing = updated,
            None => self.field_values.push(updated),
        }
    }
}
