use crate::query::{
    ast::insert::{ConflictAction, Insert, OnConflict},
    renderer::{Render, Renderer},
};

impl Render for Insert {
    fn render(&self, r: &mut Renderer) {
        // 1. INSERT INTO table (...)
        r.sql.push_str("INSERT INTO ");
        r.render_table_ref(&self.table);
        r.sql.push_str(" (");
        r.push_ident_list(&self.columns);
        r.sql.push(')');

        // 2. VALUES (...) or SELECT ...
        if !self.values.is_empty() {
            render_values(self, r);
        } else if let Some(select) = &self.select {
            r.sql.push(' ');
            select.render(r);
        }

        if let Some(on_conflict) = &self.on_conflict {
            render_on_conflict(on_conflict, r);
        }

        if !self.returning.is_empty() {
            r.sql.push_str(" RETURNING ");
            r.push_ident_list(&self.returning);
        }
    }
}

fn render_values(insert: &Insert, r: &mut Renderer) {
    r.sql.push_str(" VALUES ");
    for (i, row) in insert.values.iter().enumerate() {
        if i > 0 {
            r.sql.push_str(", ");
        }
        r.sql.push('(');
        for (j, val) in row.iter().enumerate() {
            if j > 0 {
                r.sql.push_str(", ");
            }
            val.render(r);
        }
        r.sql.push(')');
    }
}

fn render_on_conflict(on_conflict: &OnConflict, r: &mut Renderer) {
    if on_conflict.columns.is_empty() {
        return;
    }

    r.sql.push_str(" ON CONFLICT (");
    r.push_ident_list(&on_conflict.columns);
    r.sql.push(')');

    match &on_conflict.action {
        ConflictAction::DoNothing => r.sql.push_str(" DO NOTHING"),
        ConflictAction::DoUpdate { assignments } => {
            if assignments.is_empty() {
                r.sql.push_str(" DO NOTHING");
                return;
            }

            r.sql.push_str(" DO UPDATE SET ");
            for (i, assignment) in assignments.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                r.push_ident(&assignment.column);
                r.sql.push_str(" = ");
                assignment.value.render(r);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::query::{
        ast::{
            common::TableRef,
            expr::Expr,
            insert::{ConflictAction, ConflictAssignment, Insert, OnConflict},
        },
        dialect::Postgres,
        renderer::{Render, Renderer},
    };

    fn value(val: Value) -> Expr {
        Expr::Value(val)
    }

    #[test]
    fn test_render_batch_insert_postgres() {
        let ast = Insert {
            table: TableRef {
                schema: None,
                name: "users".to_string(),
            },
            columns: vec!["name".to_string(), "is_active".to_string()],
            values: vec![
                vec![
                    value(Value::String("Alice".to_string())),
                    value(Value::Boolean(true)),
                ],
                vec![
                    value(Value::String("Bob".to_string())),
                    value(Value::Boolean(false)),
                ],
            ],
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        let expected_sql = r#"INSERT INTO "users" ("name", "is_active") VALUES ($1, $2), ($3, $4)"#;
        assert_eq!(sql, expected_sql);
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_render_upsert_with_returning() {
        let ast = Insert {
            table: TableRef {
                schema: None,
                name: "User".to_string(),
            },
            columns: vec!["id".to_string(), "email".to_string()],
            values: vec![vec![
                value(Value::String("u1".into())),
                value(Value::String("a@x.io".into())),
            ]],
            on_conflict: Some(OnConflict {
                columns: vec!["id".to_string()],
                action: ConflictAction::DoUpdate {
                    assignments: vec![ConflictAssignment {
                        column: "email".to_string(),
                        value: Expr::Excluded("email".to_string()),
                    }],
                },
            }),
            returning: vec!["id".to_string()],
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();

        assert_eq!(
            sql,
            concat!(
                "INSERT INTO \"User\" (\"id\", \"email\") VALUES ($1, $2) ",
                "ON CONFLICT (\"id\") DO UPDATE SET \"email\" = EXCLUDED.\"email\" ",
                "RETURNING \"id\""
            )
        );
    }

    #[test]
    fn test_update_without_assignments_degrades_to_do_nothing() {
        let ast = Insert {
            table: TableRef {
                schema: None,
                name: "Tag".to_string(),
            },
            columns: vec!["id".to_string()],
            values: vec![vec![value(Value::Int(1))]],
            on_conflict: Some(OnConflict {
                columns: vec!["id".to_string()],
                action: ConflictAction::DoUpdate {
                    assignments: vec![],
                },
            }),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();
        assert!(sql.ends_with("ON CONFLICT (\"id\") DO NOTHING"));
    }
}
