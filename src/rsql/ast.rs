//! Expression tree produced by the parser.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Comparison operator of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Equals,
    NotEquals,
    Like,
    NotLike,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    In,
    NotIn,
}

impl Comparator {
    /// Filter-language spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Equals => "==",
            Comparator::NotEquals => "!=",
            Comparator::Like => "==~",
            Comparator::NotLike => "!=~",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEquals => ">=",
            Comparator::LessThan => "<",
            Comparator::LessThanOrEquals => "<=",
            Comparator::In => "=in=",
            Comparator::NotIn => "=out=",
        }
    }

    /// `=in=` and `=out=` always carry a list.
    pub fn takes_list(self) -> bool {
        matches!(self, Comparator::In | Comparator::NotIn)
    }
}

/// Literal value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
}

impl Value {
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// `field <comparator> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub identifier: String,
    pub comparator: Comparator,
    pub value: Value,
}

/// Parsed filter expression.
///
/// `And`/`Or` always hold at least two children, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Or(Vec<Expression>),
    And(Vec<Expression>),
    Comparison(Comparison),
}

impl Expression {
    pub fn comparison(identifier: impl Into<String>, comparator: Comparator, value: Value) -> Self {
        Expression::Comparison(Comparison {
            identifier: identifier.into(),
            comparator,
            value,
        })
    }

    /// Children of an `And`/`Or` node; empty for a comparison.
    pub fn children(&self) -> &[Expression] {
        match self {
            Expression::Or(items) | Expression::And(items) => items,
            Expression::Comparison(_) => &[],
        }
    }
}
