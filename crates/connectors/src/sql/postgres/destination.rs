use crate::sql::{
    base::{
        adapter::{DestinationAdapter, WriteTransaction},
        error::DbError,
        query::generator::{ColumnTypes, QueryGenerator},
        requests::PlaceholderRequest,
    },
    postgres::params::bind_values,
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::RowData, sync::table::TableSpec};
use planner::query::dialect;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const QUERY_COLUMN_TYPES_SQL: &str = include_str!("sql/column_types.sql");
const PLACEHOLDER_SAVEPOINT: &str = "fk_placeholder";

type ColumnTypeCache = Arc<RwLock<HashMap<String, Arc<ColumnTypes>>>>;

/// Write side over the destination pool. Column types are read once per
/// table and shared by every transaction opened from this adapter.
#[derive(Clone)]
pub struct PgDestination {
    pool: PgPool,
    column_types: ColumnTypeCache,
}

impl PgDestination {
    pub fn new(pool: PgPool) -> Self {
        PgDestination {
            pool,
            column_types: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DestinationAdapter for PgDestination {
    async fn begin(&self) -> Result<Box<dyn WriteTransaction>, DbError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgWriteTransaction {
            tx,
            column_types: Arc::clone(&self.column_types),
            dialect: dialect::Postgres,
        }))
    }
}

pub struct PgWriteTransaction {
    tx: Transaction<'static, Postgres>,
    column_types: ColumnTypeCache,
    dialect: dialect::Postgres,
}

impl PgWriteTransaction {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        debug!("Executing query: {sql}");
        let result = bind_values(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn table_column_types(&mut self, table: &str) -> Result<Arc<ColumnTypes>, DbError> {
        if let Some(types) = self.column_types.read().await.get(table) {
            return Ok(Arc::clone(types));
        }

        let rows = sqlx::query(QUERY_COLUMN_TYPES_SQL)
            .bind(table)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut types = ColumnTypes::new();
        for row in rows {
            let column: String = row.try_get("column_name")?;
            let udt: String = row.try_get("udt_name")?;
            types.insert(column, udt);
        }
        if types.is_empty() {
            warn!("No column metadata found for table `{table}`; parameters are bound untyped");
        }

        let types = Arc::new(types);
        self.column_types
            .write()
            .await
            .insert(table.to_string(), Arc::clone(&types));
        Ok(types)
    }

    async fn savepoint(&mut self, statement: &str) -> Result<(), DbError> {
        let sql = format!("{statement} {PLACEHOLDER_SAVEPOINT}");
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }
}

#[async_trait]
impl WriteTransaction for PgWriteTransaction {
    async fn has_rows(&mut self, table: &str) -> Result<bool, DbError> {
        let sql = QueryGenerator::new(&self.dialect).has_rows(table);
        debug!("Executing query: {sql}");

        // A missing table must not abort the surrounding transaction.
        self.savepoint("SAVEPOINT").await?;
        match sqlx::query(&sql).fetch_optional(&mut *self.tx).await {
            Ok(row) => {
                self.savepoint("RELEASE SAVEPOINT").await?;
                Ok(row.is_some())
            }
            Err(err) => {
                self.savepoint("ROLLBACK TO SAVEPOINT").await?;
                Err(err.into())
            }
        }
    }

    async fn insert_placeholders(&mut self, request: &PlaceholderRequest) -> Result<u64, DbError> {
        let types = self.table_column_types(&request.table).await?;
        let key_type = types.get(&request.key_column).map(String::as_str);
        let (sql, params) = QueryGenerator::new(&self.dialect).insert_placeholders(request, key_type);

        self.savepoint("SAVEPOINT").await?;
        match self.execute(&sql, &params).await {
            Ok(rows) => {
                self.savepoint("RELEASE SAVEPOINT").await?;
                Ok(rows)
            }
            Err(err) => {
                self.savepoint("ROLLBACK TO SAVEPOINT").await?;
                Err(err)
            }
        }
    }

    async fn upsert_row(&mut self, spec: &TableSpec, row: &RowData) -> Result<(), DbError> {
        let types = self.table_column_types(&spec.name).await?;
        let (sql, params) = QueryGenerator::new(&self.dialect).upsert(spec, row, &types);
        self.execute(&sql, &params).await?;
        Ok(())
    }

    async fn mark_deleted(
        &mut self,
        table: &str,
        primary_key: &str,
        deleted_column: &str,
        id: &Value,
        deleted_at: &Value,
    ) -> Result<u64, DbError> {
        let types = self.table_column_types(table).await?;
        let (sql, params) = QueryGenerator::new(&self.dialect).mark_deleted(
            table,
            primary_key,
            deleted_column,
            id,
            deleted_at,
            &types,
        );
        self.execute(&sql, &params).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
