use crate::{
    error::InternalError,
    filter::{Filter, FilterKind, Operator},
    value::Value,
};
use std::fmt;

///
/// Predicate
///
/// One conjunct of a WHERE clause: `column op value`. Null checks carry
/// `Value::Null`. Values are in engine form.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Ge, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Le, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(column, Operator::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, Operator::IsNull, Value::Null)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(column, Operator::IsNotNull, Value::Null)
    }

    /// The single-operator filter that evaluates this predicate.
    pub fn to_filter(&self) -> Result<Filter, InternalError> {
        let kind = match self.op {
            Operator::Eq => FilterKind::Equal,
            Operator::Ne => FilterKind::NotEqual,
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => FilterKind::Range,
            Operator::IsNull => FilterKind::IsNull,
            Operator::IsNotNull => FilterKind::IsNotNull,
            Operator::Like => FilterKind::Like,
        };

        Ok(kind.build(&[(self.op, self.value.clone())])?)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.takes_value() {
            write!(f, "{} {} {}", self.column, self.op, self.value.describe())
        } else {
            write!(f, "{} {}", self.column, self.op)
        }
    }
}
