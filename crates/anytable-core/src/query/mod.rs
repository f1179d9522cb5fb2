//! Module: query
//! Responsibility: single-table statement descriptions handed to a
//! connection.
//! Does not own: planning or execution (see `plan`, `exec`, `dml`).
//!
//! Statements are conjunctive: every predicate must hold. There are no
//! joins, projections beyond column lists, or aggregates.

mod predicate;

pub use predicate::Predicate;

use crate::{adapter::Row, filter::Direction, value::Value};
use std::collections::BTreeMap;

///
/// Select
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Select {
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub predicates: Vec<Predicate>,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    /// Read every column of a table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

///
/// Insert
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Insert {
    pub table: String,
    pub row: Row,
}

impl Insert {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            row: Row::new(),
        }
    }

    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.row.set(column, value);
        self
    }

    /// Request an explicit rowid instead of letting the adapter assign one.
    #[must_use]
    pub const fn rowid(mut self, rowid: i64) -> Self {
        self.row.rowid = Some(rowid);
        self
    }
}

///
/// Update
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    pub table: String,
    pub set: BTreeMap<String, Value>,
    pub predicates: Vec<Predicate>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

///
/// Delete
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delete {
    pub table: String,
    pub predicates: Vec<Predicate>,
}

impl Delete {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}
