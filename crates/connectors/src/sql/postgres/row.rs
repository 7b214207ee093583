use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use sqlx::{
    Column, Row, TypeInfo, ValueRef,
    postgres::{PgColumn, PgRow},
};
use uuid::Uuid;

/// Converts a Postgres row into a `RowData` for `table`.
pub fn decode_row(table: &str, row: &PgRow) -> Result<RowData, DbError> {
    let field_values = row
        .columns()
        .iter()
        .map(|column| Ok(FieldValue::new(column.name(), decode_column(row, column)?)))
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(RowData::new(table, field_values))
}

/// Decodes a single column by its Postgres type name. Types without a
/// dedicated variant (enums, domains, citext, ...) are read through their
/// text form and kept as `Value::Enum(type, label)`.
pub fn decode_column(row: &PgRow, column: &PgColumn) -> Result<Value, DbError> {
    let idx = column.ordinal();
    let type_name = column.type_info().name();

    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "INT2" => Value::Int(row.try_get::<i16, _>(idx)?.into()),
        "INT4" => Value::Int(row.try_get::<i32, _>(idx)?.into()),
        "INT8" => Value::Int(row.try_get::<i64, _>(idx)?),
        "FLOAT4" => Value::Float(row.try_get::<f32, _>(idx)?.into()),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(idx)?),
        "NUMERIC" => Value::Decimal(row.try_get::<BigDecimal, _>(idx)?),
        "BOOL" => Value::Boolean(row.try_get::<bool, _>(idx)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::String(row.try_get::<String, _>(idx)?),
        "JSON" | "JSONB" => Value::Json(row.try_get::<serde_json::Value, _>(idx)?),
        "UUID" => Value::Uuid(row.try_get::<Uuid, _>(idx)?),
        "BYTEA" => Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
        "DATE" => Value::Date(row.try_get::<NaiveDate, _>(idx)?),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "TIMESTAMP" => Value::TimestampNaive(row.try_get::<NaiveDateTime, _>(idx)?),
        "TIMESTAMPTZ" => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(idx)?),
        "TEXT[]" | "VARCHAR[]" => Value::StringArray(row.try_get::<Vec<String>, _>(idx)?),
        other if is_builtin(other) => {
            return Err(DbError::Decode {
                column: column.name().to_string(),
                type_name: other.to_string(),
                reason: "no value mapping for this built-in type".to_string(),
            });
        }
        other => Value::Enum(
            other.to_string(),
            row.try_get_unchecked::<String, _>(idx)?,
        ),
    };

    Ok(value)
}

/// Built-in types whose binary encoding is not text, so reading them as a
/// string would produce garbage.
fn is_builtin(type_name: &str) -> bool {
    type_name.ends_with("[]")
        || matches!(
            type_name,
            "INTERVAL"
                | "TIMETZ"
                | "MONEY"
                | "INET"
                | "CIDR"
                | "MACADDR"
                | "OID"
                | "POINT"
                | "BOX"
                | "INT4RANGE"
                | "INT8RANGE"
                | "TSRANGE"
                | "TSTZRANGE"
                | "DATERANGE"
                | "BIT"
                | "VARBIT"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_type_names_are_not_builtin() {
        assert!(!is_builtin("UserStatus"));
        assert!(!is_builtin("citext"));
        assert!(is_builtin("INTERVAL"));
        assert!(is_builtin("INT4[]"));
    }
}
