use crate::sql::{
    base::{
        adapter::SourceAdapter,
        error::DbError,
        query::generator::{FK_VALUE_ALIAS, MAX_VALUE_ALIAS, QueryGenerator},
        requests::{FetchRowsRequest, SoftDeletedRowsRequest},
    },
    postgres::{
        params::bind_values,
        row::{decode_column, decode_row},
    },
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use model::{core::value::Value, records::row::RowData};
use planner::query::dialect;
use sqlx::{Column, PgPool, Row};
use tracing::debug;

/// Read-only adapter over the source pool.
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
    dialect: dialect::Postgres,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        PgSource {
            pool,
            dialect: dialect::Postgres,
        }
    }

    fn generator(&self) -> QueryGenerator<'_> {
        QueryGenerator::new(&self.dialect)
    }

    async fn query_rows(&self, table: &str, sql: &str, params: &[Value]) -> Result<Vec<RowData>, DbError> {
        debug!("Executing query: {sql}");
        let mut stream = bind_values(sqlx::query(sql), params).fetch(&self.pool);
        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            rows.push(decode_row(table, &row)?);
        }
        Ok(rows)
    }

    /// Single-column query; each row contributes the value under `alias`.
    async fn query_column(&self, sql: &str, alias: &str) -> Result<Vec<Value>, DbError> {
        debug!("Executing query: {sql}");
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let column = row
                    .columns()
                    .iter()
                    .find(|c| c.name() == alias)
                    .ok_or_else(|| DbError::Unknown(format!("Column `{alias}` missing from result")))?;
                decode_column(row, column)
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for PgSource {
    async fn max_value(&self, table: &str, column: &str) -> Result<Value, DbError> {
        let sql = self.generator().max_value(table, column);
        let values = self.query_column(&sql, MAX_VALUE_ALIAS).await?;
        Ok(values.into_iter().next().unwrap_or(Value::Null))
    }

    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        let (sql, params) = self.generator().select_rows(request);
        self.query_rows(&request.table, &sql, &params).await
    }

    async fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<Value>, DbError> {
        let sql = self.generator().distinct_values(table, column);
        self.query_column(&sql, FK_VALUE_ALIAS).await
    }

    async fn soft_deleted_rows(
        &self,
        request: &SoftDeletedRowsRequest,
    ) -> Result<Vec<RowData>, DbError> {
        let (sql, params) = self.generator().soft_deleted_rows(request);
        self.query_rows(&request.table, &sql, &params).await
    }
}
