use crate::query::{
    ast::expr::{BinaryOp, Expr},
    renderer::{Render, Renderer},
};
use model::core::value::Value;

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => {
                if let Some(qualifier) = &ident.qualifier {
                    r.push_ident(qualifier);
                    r.sql.push('.');
                }
                r.push_ident(&ident.name);
            }
            // NULL stays out of the parameter list: a prepared statement keeps
            // the parameter types of its first execution.
            Expr::Value(Value::Null) => r.sql.push_str("NULL"),
            Expr::Value(value) => r.add_param(value.clone()),
            Expr::Literal(sql) => r.sql.push_str(sql),
            Expr::Excluded(column) => {
                r.sql.push_str("EXCLUDED.");
                r.push_ident(column);
            }
            Expr::BinaryOp(op) => op.render(r),
            Expr::Cast { expr, type_name } => {
                expr.render(r);
                r.sql.push_str("::");
                r.push_ident(&type_name.name);
                if type_name.array {
                    r.sql.push_str("[]");
                }
            }
            Expr::FunctionCall { name, args } => {
                r.sql.push_str(name);
                r.sql.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    arg.render(r);
                }
                r.sql.push(')');
            }
            Expr::IsNull { expr, negated } => {
                expr.render(r);
                r.sql.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::Grouped(inner) => {
                r.sql.push('(');
                inner.render(r);
                r.sql.push(')');
            }
        }
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        self.left.render(r);
        r.sql.push(' ');
        r.sql.push_str(self.op.as_sql());
        r.sql.push(' ');
        self.right.render(r);
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::{
            common::TypeName,
            expr::{BinaryOperator, Expr},
        },
        dialect::Postgres,
        ident,
        renderer::render,
        value,
    };
    use model::core::value::Value;

    #[test]
    fn test_render_cast_array_and_call() {
        let expr = Expr::call(
            "unnest",
            vec![value(Value::StringArray(vec!["a".into()])).cast(TypeName::array_of("text"))],
        );
        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(sql, r#"unnest($1::"text"[])"#);
        assert_eq!(params, vec![Value::StringArray(vec!["a".into()])]);
    }

    #[test]
    fn test_render_conjunction_with_group() {
        let predicate = Expr::conjunction(vec![
            Expr::binary(ident("updatedAt"), BinaryOperator::Gt, value(Value::Int(7))),
            Expr::Literal(r#""id" IN (SELECT 1)"#.into()).grouped(),
            ident("deletedAt").is_not_null(),
        ])
        .unwrap();

        let (sql, params) = render(&predicate, &Postgres);
        assert_eq!(
            sql,
            r#""updatedAt" > $1 AND ("id" IN (SELECT 1)) AND "deletedAt" IS NOT NULL"#
        );
        assert_eq!(params, vec![Value::Int(7)]);
    }

    #[test]
    fn test_null_renders_inline_and_keeps_numbering() {
        let expr = Expr::call(
            "f",
            vec![
                value(Value::Int(1)),
                value(Value::Null).cast(TypeName::new("timestamp")),
                value(Value::Int(2)),
            ],
        );

        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(sql, r#"f($1, NULL::"timestamp", $2)"#);
        assert_eq!(params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_empty_conjunction_is_none() {
        assert!(Expr::conjunction(vec![]).is_none());
    }
}
