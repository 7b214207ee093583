use crate::query::ast::{
    common::TableRef,
    expr::Expr,
    insert::{ConflictAction, ConflictAssignment, Insert, OnConflict},
    select::Select,
};

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    ast: Insert,
}

impl InsertBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: Insert {
                table,
                ..Default::default()
            },
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.ast.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn values(mut self, row: Vec<Expr>) -> Self {
        self.ast.values.push(row);
        self
    }

    pub fn select(mut self, select: Select) -> Self {
        self.ast.select = Some(select);
        self
    }

    pub fn on_conflict_do_nothing(mut self, columns: &[&str]) -> Self {
        self.ast.on_conflict = Some(OnConflict {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            action: ConflictAction::DoNothing,
        });
        self
    }

    /// `ON CONFLICT (...) DO UPDATE SET col = EXCLUDED.col` for each column.
    pub fn on_conflict_overwrite(mut self, columns: &[&str], update: &[&str]) -> Self {
        let assignments = update
            .iter()
            .map(|col| ConflictAssignment {
                column: col.to_string(),
                value: Expr::Excluded(col.to_string()),
            })
            .collect();

        self.ast.on_conflict = Some(OnConflict {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            action: ConflictAction::DoUpdate { assignments },
        });
        self
    }

    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.ast.returning = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn build(self) -> Insert {
        self.ast
    }
}
