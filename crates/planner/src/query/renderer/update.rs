use crate::query::{
    ast::update::Update,
    renderer::{Render, Renderer},
};

impl Render for Update {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("UPDATE ");
        r.render_table_ref(&self.table);
        r.sql.push_str(" SET ");
        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            r.push_ident(&assignment.column);
            r.sql.push_str(" = ");
            assignment.value.render(r);
        }

        if let Some(predicate) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            predicate.render(r);
        }
    }
}
