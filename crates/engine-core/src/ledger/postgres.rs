use crate::{
    error::LedgerError,
    ledger::{LEDGER_TABLE, SyncLedger},
};
use async_trait::async_trait;
use connectors::sql::postgres::{params::bind_values, row::decode_row};
use model::{
    core::value::Value,
    records::row::RowData,
    sync::ledger::{EntryId, LedgerEntry, SyncStatus},
};
use planner::query::{
    ast::{
        common::{OrderDir, TypeName},
        expr::{BinaryOperator, Expr},
    },
    builder::{insert::InsertBuilder, select::SelectBuilder, update::UpdateBuilder},
    dialect::{self, Dialect},
    renderer::render,
};
use planner::{ident, table_ref, value};
use sqlx::PgPool;
use tracing::debug;

const CREATE_LEDGER_SQL: &str = include_str!("sql/create_sync_log.sql");

const ENTRY_COLUMNS: [&str; 7] = [
    "id",
    "table_name",
    "status",
    "last_sync_timestamp",
    "sync_completed_at",
    "rows_synced",
    "error_message",
];

/// Ledger stored in the destination database's `sync_log` table.
#[derive(Clone)]
pub struct PgSyncLedger {
    pool: PgPool,
    dialect: dialect::Postgres,
}

impl PgSyncLedger {
    pub fn new(pool: PgPool) -> Self {
        PgSyncLedger {
            pool,
            dialect: dialect::Postgres,
        }
    }

    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<RowData>, LedgerError> {
        debug!("Executing query: {sql}");
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| decode_row(LEDGER_TABLE, row).map_err(LedgerError::from))
            .collect()
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}

/// A NULL watermark is written inline, so it never types the statement.
fn start_entry_query(dialect: &dyn Dialect, table: &str, watermark: &Value) -> (String, Vec<Value>) {
    let insert = InsertBuilder::new(table_ref!(LEDGER_TABLE))
        .columns(&["table_name", "status", "last_sync_timestamp"])
        .values(vec![
            value!(table.into()),
            value!(SyncStatus::InProgress.as_str().into()),
            value!(watermark.clone()).cast(TypeName::new("timestamp")),
        ])
        .returning(&["id"])
        .build();
    render(&insert, dialect)
}

fn eq(column: &str, val: Value) -> Expr {
    Expr::binary(ident!(column), BinaryOperator::Eq, value!(val))
}

#[async_trait]
impl SyncLedger for PgSyncLedger {
    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(CREATE_LEDGER_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn last_completed_watermark(&self, table: &str) -> Result<Option<Value>, LedgerError> {
        let select = SelectBuilder::new()
            .select(vec![ident!("last_sync_timestamp")])
            .from(table_ref!(LEDGER_TABLE))
            .and_where(eq("table_name", table.into()))
            .and_where(eq("status", SyncStatus::Completed.as_str().into()))
            .order_by(ident!("sync_completed_at"), OrderDir::Desc)
            .order_by(ident!("id"), OrderDir::Desc)
            .limit(1)
            .build();
        let (sql, params) = render(&select, self.dialect());

        let rows = self.fetch(&sql, &params).await?;
        Ok(rows
            .first()
            .map(|row| row.get_value("last_sync_timestamp"))
            .filter(|v| !v.is_null()))
    }

    async fn start_entry(&self, table: &str, watermark: &Value) -> Result<EntryId, LedgerError> {
        let (sql, params) = start_entry_query(self.dialect(), table, watermark);

        let rows = self.fetch(&sql, &params).await?;
        rows.first()
            .and_then(|row| row.get_value("id").as_i64())
            .ok_or_else(|| LedgerError::Malformed("INSERT returned no id".to_string()))
    }

    async fn finish_entry(
        &self,
        id: EntryId,
        rows_synced: i64,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> Result<(), LedgerError> {
        let update = UpdateBuilder::new(table_ref!(LEDGER_TABLE))
            .set("sync_completed_at", Expr::Literal("CURRENT_TIMESTAMP".to_string()))
            .set("rows_synced", value!(Value::Int(rows_synced)))
            .set("status", value!(status.as_str().into()))
            .set("error_message", value!(error_message.into()))
            .and_where(eq("id", Value::Int(id)))
            .build();
        let (sql, params) = render(&update, self.dialect());

        debug!("Executing query: {sql}");
        let result = bind_values(sqlx::query(&sql), &params)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::MissingEntry(id));
        }
        Ok(())
    }

    async fn recent_entries(
        &self,
        table: Option<&str>,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut select = SelectBuilder::new()
            .select(ENTRY_COLUMNS.iter().map(|c| ident!(c)).collect())
            .from(table_ref!(LEDGER_TABLE));
        if let Some(table) = table {
            select = select.and_where(eq("table_name", table.into()));
        }
        let select = select.order_by(ident!("id"), OrderDir::Desc).limit(limit).build();
        let (sql, params) = render(&select, self.dialect());

        self.fetch(&sql, &params)
            .await?
            .iter()
            .map(entry_from_row)
            .collect()
    }
}

fn entry_from_row(row: &RowData) -> Result<LedgerEntry, LedgerError> {
    let id = row
        .get_value("id")
        .as_i64()
        .ok_or_else(|| LedgerError::Malformed("missing id".to_string()))?;
    let status = row
        .get_value("status")
        .as_string()
        .ok_or_else(|| LedgerError::Malformed(format!("entry {id} has no status")))?
        .parse::<SyncStatus>()
        .map_err(LedgerError::Malformed)?;

    let sync_completed_at = match row.get_value("sync_completed_at") {
        Value::Timestamp(ts) => Some(ts),
        Value::TimestampNaive(ts) => Some(ts.and_utc()),
        _ => None,
    };
    let last_sync_timestamp = Some(row.get_value("last_sync_timestamp")).filter(|v| !v.is_null());

    Ok(LedgerEntry {
        id,
        table_name: row.get_value("table_name").as_string().unwrap_or_default(),
        status,
        last_sync_timestamp,
        sync_completed_at,
        rows_synced: row.get_value("rows_synced").as_i64().unwrap_or(0),
        error_message: row.get_value("error_message").as_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_entry_from_row_accepts_naive_completion_time() {
        let completed = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let row = RowData::from_pairs(
            LEDGER_TABLE,
            [
                ("id", Value::Int(7)),
                ("table_name", "User".into()),
                ("status", "completed".into()),
                ("last_sync_timestamp", Value::Null),
                ("sync_completed_at", Value::TimestampNaive(completed)),
                ("rows_synced", Value::Int(2)),
                ("error_message", Value::Null),
            ],
        );

        let entry = entry_from_row(&row).unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.status, SyncStatus::Completed);
        assert_eq!(entry.last_sync_timestamp, None);
        assert_eq!(entry.sync_completed_at, Some(completed.and_utc()));
        assert_eq!(entry.rows_synced, 2);
        assert_eq!(entry.error_message, None);
    }

    #[test]
    fn test_null_watermark_is_not_a_parameter() {
        let dialect = dialect::Postgres;
        let (null_sql, null_params) = start_entry_query(&dialect, "Image", &Value::Null);
        assert_eq!(
            null_sql,
            r#"INSERT INTO "sync_log" ("table_name", "status", "last_sync_timestamp") VALUES ($1, $2, NULL::"timestamp") RETURNING "id""#
        );
        assert_eq!(null_params, vec![Value::from("Image"), Value::from("in_progress")]);

        let watermark = Value::TimestampNaive(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let (sql, params) = start_entry_query(&dialect, "User", &watermark);
        assert!(sql.contains(r#"$3::"timestamp""#));
        assert_eq!(params[2], watermark);
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        let row = RowData::from_pairs(
            LEDGER_TABLE,
            [("id", Value::Int(1)), ("status", "paused".into())],
        );
        assert!(matches!(entry_from_row(&row), Err(LedgerError::Malformed(_))));
    }
}
