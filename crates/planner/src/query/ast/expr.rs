//! Expression nodes shared by every statement.

use crate::query::ast::common::TypeName;
use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column reference, optionally qualified: `"t"."id"`.
    Identifier(Ident),

    /// A bound parameter. Rendered as a placeholder, never inlined.
    Value(Value),

    /// A raw SQL fragment rendered verbatim, e.g. `CURRENT_TIMESTAMP`.
    Literal(String),

    /// The incoming row of an `ON CONFLICT DO UPDATE`: `EXCLUDED."col"`.
    Excluded(String),

    BinaryOp(Box<BinaryOp>),

    Cast {
        expr: Box<Expr>,
        type_name: TypeName,
    },

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },

    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },

    /// Wraps the inner expression in parentheses.
    Grouped(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::And, other)
    }

    pub fn cast(self, type_name: TypeName) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            type_name,
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn grouped(self) -> Expr {
        Expr::Grouped(Box::new(self))
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::FunctionCall {
            name: name.to_string(),
            args,
        }
    }

    /// Folds a list of predicates into a single `AND` chain.
    pub fn conjunction(predicates: Vec<Expr>) -> Option<Expr> {
        predicates.into_iter().reduce(Expr::and)
    }
}
