use crate::query::ast::{
    common::{OrderDir, TableRef},
    expr::Expr,
    select::{OrderByExpr, Select, SelectItem},
};

#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    ast: Select,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: Vec<Expr>) -> Self {
        self.ast.columns = columns
            .into_iter()
            .map(|expr| SelectItem { expr, alias: None })
            .collect();
        self
    }

    pub fn select_as(mut self, expr: Expr, alias: &str) -> Self {
        self.ast.columns.push(SelectItem {
            expr,
            alias: Some(alias.to_string()),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.ast.distinct = true;
        self
    }

    pub fn from(mut self, table: TableRef) -> Self {
        self.ast.from = Some(table);
        self
    }

    /// Adds a predicate, AND-ing it with any existing WHERE clause.
    pub fn and_where(mut self, predicate: Expr) -> Self {
        self.ast.where_clause = match self.ast.where_clause.take() {
            Some(existing) => Some(existing.and(predicate)),
            None => Some(predicate),
        };
        self
    }

    pub fn order_by(mut self, expr: Expr, direction: OrderDir) -> Self {
        self.ast.order_by.push(OrderByExpr {
            expr,
            direction: Some(direction),
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.ast.limit = Some(limit);
        self
    }

    pub fn build(self) -> Select {
        self.ast
    }
}
