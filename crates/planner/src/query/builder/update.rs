use crate::query::ast::{
    common::TableRef,
    expr::Expr,
    update::{Assignment, Update},
};

#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    ast: Update,
}

impl UpdateBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: Update {
                table,
                ..Default::default()
            },
        }
    }

    pub fn set(mut self, column: &str, value: Expr) -> Self {
        self.ast.assignments.push(Assignment {
            column: column.to_string(),
            value,
        });
        self
    }

    pub fn and_where(mut self, predicate: Expr) -> Self {
        self.ast.where_clause = match self.ast.where_clause.take() {
            Some(existing) => Some(existing.and(predicate)),
            None => Some(predicate),
        };
        self
    }

    pub fn build(self) -> Update {
        self.ast
    }
}
