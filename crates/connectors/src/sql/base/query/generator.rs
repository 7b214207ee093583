use crate::sql::base::requests::{FetchRowsRequest, PlaceholderRequest, SoftDeletedRowsRequest};
use model::{core::value::Value, records::row::RowData, sync::table::TableSpec};
use planner::query::{
    ast::{
        common::{OrderDir, TypeName},
        expr::{BinaryOperator, Expr},
    },
    builder::{insert::InsertBuilder, select::SelectBuilder, update::UpdateBuilder},
    dialect::Dialect,
    renderer::{Render, render},
};
use planner::{ident, table_ref, value};
use std::collections::HashMap;

/// Destination column name to Postgres type name (`udt_name`).
pub type ColumnTypes = HashMap<String, String>;

pub const MAX_VALUE_ALIAS: &str = "max_value";
pub const FK_VALUE_ALIAS: &str = "fk_id";

pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// `SELECT cols FROM t [WHERE wm > $1 AND (filter)] ORDER BY wm ASC`
    pub fn select_rows(&self, request: &FetchRowsRequest) -> (String, Vec<Value>) {
        let columns = request.columns.iter().map(|c| ident!(c)).collect();
        let mut select = SelectBuilder::new()
            .select(columns)
            .from(table_ref!(&request.table));

        if let Some(since) = &request.since {
            select = select.and_where(Expr::binary(
                ident!(&request.watermark_column),
                BinaryOperator::Gt,
                value!(since.clone()),
            ));
        }
        if let Some(filter) = &request.filter {
            select = select.and_where(Expr::Literal(filter.clone()).grouped());
        }

        let select = select
            .order_by(ident!(&request.watermark_column), OrderDir::Asc)
            .build();
        self.render(&select)
    }

    /// Current maximum of `column`, aliased as [`MAX_VALUE_ALIAS`].
    pub fn max_value(&self, table: &str, column: &str) -> String {
        let select = SelectBuilder::new()
            .select_as(Expr::call("MAX", vec![ident!(column)]), MAX_VALUE_ALIAS)
            .from(table_ref!(table))
            .build();
        self.render(&select).0
    }

    /// Distinct non-null values of `column`, aliased as [`FK_VALUE_ALIAS`].
    pub fn distinct_values(&self, table: &str, column: &str) -> String {
        let select = SelectBuilder::new()
            .distinct()
            .select_as(ident!(column), FK_VALUE_ALIAS)
            .from(table_ref!(table))
            .and_where(ident!(column).is_not_null())
            .build();
        self.render(&select).0
    }

    pub fn soft_deleted_rows(&self, request: &SoftDeletedRowsRequest) -> (String, Vec<Value>) {
        let mut select = SelectBuilder::new()
            .select(vec![
                ident!(&request.primary_key),
                ident!(&request.deleted_column),
            ])
            .from(table_ref!(&request.table))
            .and_where(ident!(&request.deleted_column).is_not_null());

        if let Some(since) = &request.since {
            select = select.and_where(Expr::binary(
                ident!(&request.deleted_column),
                BinaryOperator::Gt,
                value!(since.clone()),
            ));
        }

        self.render(&select.build())
    }

    pub fn has_rows(&self, table: &str) -> String {
        let select = SelectBuilder::new()
            .select(vec![Expr::Literal("1".to_string())])
            .from(table_ref!(table))
            .limit(1)
            .build();
        self.render(&select).0
    }

    /// Insert-or-ignore of stub rows. Ids travel as one `text[]` parameter and
    /// are cast back to `key_type` when the key column is not text.
    pub fn insert_placeholders(
        &self,
        request: &PlaceholderRequest,
        key_type: Option<&str>,
    ) -> (String, Vec<Value>) {
        let ids = request
            .ids
            .iter()
            .filter_map(Value::as_string)
            .collect::<Vec<_>>();

        let mut key = Expr::call(
            "unnest",
            vec![value!(Value::StringArray(ids)).cast(TypeName::array_of("text"))],
        );
        if let Some(key_type) = key_type.filter(|t| *t != "text") {
            key = key.cast(TypeName::new(key_type));
        }

        let mut projection = vec![key];
        let mut columns = vec![request.key_column.as_str()];
        for column in &request.timestamp_columns {
            projection.push(Expr::Literal("CURRENT_TIMESTAMP".to_string()));
            columns.push(column.as_str());
        }

        let insert = InsertBuilder::new(table_ref!(&request.table))
            .columns(&columns)
            .select(SelectBuilder::new().select(projection).build())
            .on_conflict_do_nothing(&[request.key_column.as_str()])
            .build();
        self.render(&insert)
    }

    /// Single-row UPSERT keyed on the primary key. Every non-key column is
    /// overwritten with the incoming value.
    pub fn upsert(&self, spec: &TableSpec, row: &RowData, types: &ColumnTypes) -> (String, Vec<Value>) {
        let columns = spec.columns.iter().map(String::as_str).collect::<Vec<_>>();
        let update = spec.non_key_columns().map(String::as_str).collect::<Vec<_>>();
        let values = spec
            .columns
            .iter()
            .map(|column| typed_param(row.get_value(column), types.get(column)))
            .collect();

        let insert = InsertBuilder::new(table_ref!(&spec.name))
            .columns(&columns)
            .values(values)
            .on_conflict_overwrite(&[spec.primary_key.as_str()], &update)
            .build();
        self.render(&insert)
    }

    /// `UPDATE t SET deleted = $1 WHERE pk = $2`
    pub fn mark_deleted(
        &self,
        table: &str,
        primary_key: &str,
        deleted_column: &str,
        id: &Value,
        deleted_at: &Value,
        types: &ColumnTypes,
    ) -> (String, Vec<Value>) {
        let update = UpdateBuilder::new(table_ref!(table))
            .set(
                deleted_column,
                typed_param(deleted_at.clone(), types.get(deleted_column)),
            )
            .and_where(Expr::binary(
                ident!(primary_key),
                BinaryOperator::Eq,
                typed_param(id.clone(), types.get(primary_key)),
            ))
            .build();
        self.render(&update)
    }

    fn render<T: Render>(&self, ast: &T) -> (String, Vec<Value>) {
        render(ast, self.dialect)
    }
}

fn typed_param(value: Value, udt: Option<&String>) -> Expr {
    match udt {
        Some(udt) => value!(value).cast(TypeName::new(udt)),
        None => value!(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use planner::query::dialect::Postgres;

    fn user() -> TableSpec {
        TableSpec::builder("User")
            .columns(&["id", "updatedAt", "email", "deletedAt"])
            .soft_delete("deletedAt")
            .source_filter(r#""id" IN (SELECT "userId" FROM "UserHangoutGroup")"#)
            .build()
    }

    fn ts() -> Value {
        Value::TimestampNaive(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_full_extraction_has_no_watermark_predicate() {
        let generator = QueryGenerator::new(&Postgres);
        let image = TableSpec::builder("Image")
            .watermark("createdAt")
            .columns(&["id", "createdAt", "url"])
            .build();
        let (sql, params) = generator.select_rows(&FetchRowsRequest::for_table(&image, None));

        assert_eq!(
            sql,
            r#"SELECT "id", "createdAt", "url" FROM "Image" ORDER BY "createdAt" ASC"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_incremental_extraction_combines_watermark_and_filter() {
        let generator = QueryGenerator::new(&Postgres);
        let (sql, params) = generator.select_rows(&FetchRowsRequest::for_table(&user(), Some(ts())));

        assert_eq!(
            sql,
            r#"SELECT "id", "updatedAt", "email", "deletedAt" FROM "User" WHERE "updatedAt" > $1 AND ("id" IN (SELECT "userId" FROM "UserHangoutGroup")) ORDER BY "updatedAt" ASC"#
        );
        assert_eq!(params, vec![ts()]);
    }

    #[test]
    fn test_max_and_distinct_queries() {
        let generator = QueryGenerator::new(&Postgres);
        assert_eq!(
            generator.max_value("Order", "updatedAt"),
            r#"SELECT MAX("updatedAt") AS "max_value" FROM "Order""#
        );
        assert_eq!(
            generator.distinct_values("Hangout", "pictureId"),
            r#"SELECT DISTINCT "pictureId" AS "fk_id" FROM "Hangout" WHERE "pictureId" IS NOT NULL"#
        );
        assert_eq!(generator.has_rows("Image"), r#"SELECT 1 FROM "Image" LIMIT 1"#);
    }

    #[test]
    fn test_placeholder_insert_unnests_text_ids() {
        let generator = QueryGenerator::new(&Postgres);
        let request = PlaceholderRequest {
            table: "Image".into(),
            key_column: "id".into(),
            timestamp_columns: vec!["createdAt".into(), "updatedAt".into()],
            ids: vec![Value::from("img-1"), Value::from("img-2")],
        };

        let (sql, params) = generator.insert_placeholders(&request, Some("text"));
        assert_eq!(
            sql,
            r#"INSERT INTO "Image" ("id", "createdAt", "updatedAt") SELECT unnest($1::"text"[]), CURRENT_TIMESTAMP, CURRENT_TIMESTAMP ON CONFLICT ("id") DO NOTHING"#
        );
        assert_eq!(
            params,
            vec![Value::StringArray(vec!["img-1".into(), "img-2".into()])]
        );

        let (sql, _) = generator.insert_placeholders(&request, Some("uuid"));
        assert!(sql.contains(r#"SELECT unnest($1::"text"[])::"uuid", CURRENT_TIMESTAMP"#));
    }

    #[test]
    fn test_upsert_overwrites_non_key_columns_with_casts() {
        let generator = QueryGenerator::new(&Postgres);
        let row = RowData::from_pairs(
            "User",
            [
                ("id", Value::from("u1")),
                ("updatedAt", ts()),
                ("email", Value::from("a@x.io")),
            ],
        );
        let types = ColumnTypes::from([
            ("id".to_string(), "text".to_string()),
            ("deletedAt".to_string(), "timestamp".to_string()),
        ]);

        let (sql, params) = generator.upsert(&user(), &row, &types);
        assert_eq!(
            sql,
            r#"INSERT INTO "User" ("id", "updatedAt", "email", "deletedAt") VALUES ($1::"text", $2, $3, NULL::"timestamp") ON CONFLICT ("id") DO UPDATE SET "updatedAt" = EXCLUDED."updatedAt", "email" = EXCLUDED."email", "deletedAt" = EXCLUDED."deletedAt""#
        );
        assert_eq!(params, vec![Value::from("u1"), ts(), Value::from("a@x.io")]);

        // A later row with the column set is a different statement, not a rebind.
        let mut deleted = row.clone();
        deleted.set("deletedAt", ts());
        let (sql_deleted, params) = generator.upsert(&user(), &deleted, &types);
        assert_ne!(sql, sql_deleted);
        assert!(sql_deleted.contains(r#"$4::"timestamp""#));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_soft_delete_queries() {
        let generator = QueryGenerator::new(&Postgres);
        let request = SoftDeletedRowsRequest::for_table(&user(), Some(ts())).unwrap();
        let (sql, params) = generator.soft_deleted_rows(&request);
        assert_eq!(
            sql,
            r#"SELECT "id", "deletedAt" FROM "User" WHERE "deletedAt" IS NOT NULL AND "deletedAt" > $1"#
        );
        assert_eq!(params, vec![ts()]);

        let (sql, params) = generator.mark_deleted(
            "User",
            "id",
            "deletedAt",
            &Value::from("u1"),
            &ts(),
            &ColumnTypes::new(),
        );
        assert_eq!(sql, r#"UPDATE "User" SET "deletedAt" = $1 WHERE "id" = $2"#);
        assert_eq!(params, vec![ts(), Value::from("u1")]);
    }
}
