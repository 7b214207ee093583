use crate::query::{
    ast::{
        common::OrderDir,
        select::{OrderByExpr, Select, SelectItem},
    },
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("SELECT ");
        if self.distinct {
            r.sql.push_str("DISTINCT ");
        }

        for (i, item) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            item.render(r);
        }

        if let Some(table) = &self.from {
            r.sql.push_str(" FROM ");
            r.render_table_ref(table);
        }

        if let Some(predicate) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            predicate.render(r);
        }

        if !self.order_by.is_empty() {
            r.sql.push_str(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                order.render(r);
            }
        }

        if let Some(limit) = self.limit {
            r.sql.push_str(&format!(" LIMIT {limit}"));
        }
    }
}

impl Render for SelectItem {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.push_ident(alias);
        }
    }
}

impl Render for OrderByExpr {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        match self.direction {
            Some(OrderDir::Asc) => r.sql.push_str(" ASC"),
            Some(OrderDir::Desc) => r.sql.push_str(" DESC"),
            None => {}
        }
    }
}
