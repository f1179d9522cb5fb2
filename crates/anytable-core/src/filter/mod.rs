//! Module: filter
//! Responsibility: typed single-column predicates and requested orderings.
//! Does not own: deciding which predicates an adapter receives (see `plan`).
//!
//! Filters are immutable value objects. They are built from the
//! (operator, value) pairs the engine hands over for one column, carry
//! adapter-internal values, and know how to check a value themselves so
//! adapters can evaluate them without any extra machinery.

mod like;
mod order;
mod range;


pub use like::LikePattern;
pub use order::{Direction, Order};
pub use range::{Endpoint, Range, Side};

use crate::{
    error::InternalError,
    value::{Value, values_equal},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

///
/// Bounds
///
/// Column name to the one filter chosen for that column.
///

pub type Bounds = BTreeMap<String, Filter>;

///
/// Operator
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    IsNull,
    IsNotNull,
    Like,
}

impl Operator {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Like => "LIKE",
        }
    }

    /// Null checks carry no right-hand value.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Equality and null checks; the operators an index lookup can serve.
    #[must_use]
    pub const fn is_point(self) -> bool {
        matches!(self, Self::Eq | Self::IsNull | Self::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

///
/// FilterKind
///
/// A filter family an adapter may declare on a column.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FilterKind {
    Equal,
    NotEqual,
    Range,
    IsNull,
    IsNotNull,
    Like,
}

impl FilterKind {
    /// Operators this family can express.
    #[must_use]
    pub const fn operators(self) -> &'static [Operator] {
        match self {
            Self::Equal => &[Operator::Eq],
            Self::NotEqual => &[Operator::Ne],
            Self::Range => &[
                Operator::Eq,
                Operator::Ge,
                Operator::Gt,
                Operator::Le,
                Operator::Lt,
            ],
            Self::IsNull => &[Operator::IsNull],
            Self::IsNotNull => &[Operator::IsNotNull],
            Self::Like => &[Operator::Like],
        }
    }

    #[must_use]
    pub fn accepts(self, operator: Operator) -> bool {
        self.operators().contains(&operator)
    }

    /// Whether several constraints on one column fold into a single
    /// filter of this family. `x != 1 AND x != 2` does not.
    #[must_use]
    pub const fn combines(self) -> bool {
        !matches!(self, Self::NotEqual | Self::Like)
    }

    /// Build one filter from every (operator, value) pair seen on a column.
    ///
    /// Contradictory pairs produce `Filter::Impossible` rather than an error.
    pub fn build(self, operations: &[(Operator, Value)]) -> Result<Filter, FilterError> {
        if let Some((operator, _)) = operations.iter().find(|(op, _)| !self.accepts(*op)) {
            return Err(FilterError::UnsupportedOperator {
                kind: self,
                operator: *operator,
            });
        }

        match self {
            Self::Equal => Ok(single_value(operations).map_or(Filter::Impossible, Filter::Equal)),
            Self::NotEqual => Ok(single_value(operations).map_or(Filter::Impossible, Filter::NotEqual)),
            Self::Range => Ok(Range::build(operations)),
            Self::IsNull => Ok(Filter::IsNull),
            Self::IsNotNull => Ok(Filter::IsNotNull),
            Self::Like => match single_value(operations) {
                Some(Value::Text(pattern)) => Ok(Filter::Like(LikePattern::new(&pattern)?)),
                Some(other) => Err(FilterError::NonTextPattern(other.describe())),
                None => Ok(Filter::Impossible),
            },
        }
    }
}

// Collapse the values of repeated operators; disagreement means the
// conjunction can never hold.
fn single_value(operations: &[(Operator, Value)]) -> Option<Value> {
    let ((_, first), rest) = operations.split_first()?;
    rest.iter()
        .all(|(_, value)| values_equal(value, first) == Some(true))
        .then(|| first.clone())
}

///
/// Filter
///

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Equal(Value),
    Impossible,
    IsNotNull,
    IsNull,
    Like(LikePattern),
    NotEqual(Value),
    Range(Range),
}

impl Filter {
    #[must_use]
    pub const fn kind(&self) -> Option<FilterKind> {
        match self {
            Self::Equal(_) => Some(FilterKind::Equal),
            Self::Impossible => None,
            Self::IsNotNull => Some(FilterKind::IsNotNull),
            Self::IsNull => Some(FilterKind::IsNull),
            Self::Like(_) => Some(FilterKind::Like),
            Self::NotEqual(_) => Some(FilterKind::NotEqual),
            Self::Range(_) => Some(FilterKind::Range),
        }
    }

    #[must_use]
    pub const fn is_impossible(&self) -> bool {
        matches!(self, Self::Impossible)
    }

    /// Evaluate the filter against one value.
    ///
    /// Null only satisfies `IsNull`.
    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Self::Equal(expected) => values_equal(value, expected) == Some(true),
            Self::Impossible => false,
            Self::IsNotNull => !value.is_null(),
            Self::IsNull => value.is_null(),
            Self::Like(pattern) => pattern.check(value),
            Self::NotEqual(expected) => values_equal(value, expected) == Some(false),
            Self::Range(range) => range.check(value),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal(value) => write!(f, "=={value}"),
            Self::Impossible => write!(f, "1 = 0"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::Like(pattern) => write!(f, "LIKE {}", pattern.pattern()),
            Self::NotEqual(value) => write!(f, "!={value}"),
            Self::Range(range) => write!(f, "{range}"),
        }
    }
}

///
/// FilterError
///

#[derive(Debug, ThisError)]
pub enum FilterError {
    #[error("invalid LIKE pattern: {0}")]
    InvalidPattern(String),

    #[error("LIKE pattern must be text, got {0}")]
    NonTextPattern(String),

    #[error("filter family {kind:?} cannot express operator {operator}")]
    UnsupportedOperator { kind: FilterKind, operator: Operator },
}

impl From<FilterError> for InternalError {
    fn from(err: FilterError) -> Self {
        Self::filter_invalid(err.to_string())
    }
}
