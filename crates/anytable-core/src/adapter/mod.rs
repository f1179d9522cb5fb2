//! Module: adapter
//! Responsibility: the contract between the core and resource adapters,
//! plus helpers adapters commonly build on.
//! Does not own: choosing an adapter for an identifier (see `registry`).

mod args;
mod cost;
mod rowid;
mod scan;
mod sql;

pub use args::{AdapterArgs, AdapterConfig, ArgValue};
pub use cost::CostModel;
pub use rowid::{RowIdError, RowIdManager};
pub use scan::{Analysis, analyze, filter_data, update_order};
pub use sql::{SqlOptions, build_sql, condition};

pub(crate) use scan::sort_rows;

use crate::{
    error::InternalError,
    field::Columns,
    filter::{Bounds, Direction, Operator},
    value::Value,
};
use std::collections::{BTreeMap, BTreeSet};

/// Cost reported by adapters that do not estimate.
pub const FIXED_COST: f64 = 666.0;

/// Row identifier, unique within one adapter instance.
pub type RowId = i64;

///
/// Support
///
/// Answer to "does this adapter handle this identifier?".
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Support {
    Yes,
    No,
    Maybe,
}

///
/// Capabilities
///
/// Optional behaviour an adapter instance declares up front.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[expect(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub limit: bool,
    pub offset: bool,
    pub requested_columns: bool,
    pub insert: bool,
    pub delete: bool,
    pub update: bool,
    pub drop: bool,
}

impl Capabilities {
    /// Read-only adapter with no slicing or projection support.
    pub const NONE: Self = Self {
        limit: false,
        offset: false,
        requested_columns: false,
        insert: false,
        delete: false,
        update: false,
        drop: false,
    };

    #[must_use]
    pub const fn with_limit_offset(mut self) -> Self {
        self.limit = true;
        self.offset = true;
        self
    }

    #[must_use]
    pub const fn with_requested_columns(mut self) -> Self {
        self.requested_columns = true;
        self
    }

    /// Insert and delete; updates fall back to delete + insert.
    #[must_use]
    pub const fn with_insert_delete(mut self) -> Self {
        self.insert = true;
        self.delete = true;
        self
    }

    #[must_use]
    pub const fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    #[must_use]
    pub const fn with_drop(mut self) -> Self {
        self.drop = true;
        self
    }
}

///
/// Row
///
/// One row keyed by column name. Columns absent from `values` read as null.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub rowid: Option<RowId>,
    pub values: BTreeMap<String, Value>,
}

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rowid: None,
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn with_rowid(mut self, rowid: RowId) -> Self {
        self.rowid = Some(rowid);
        self
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(column).unwrap_or(&NULL)
    }
}

/// Lazy row stream returned by `Adapter::get_data`.
///
/// Dropping it early must release whatever the adapter holds open.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Row, InternalError>> + 'a>;

///
/// ScanRequest
///
/// Everything the planner delegated for one fetch. Values inside `bounds`
/// are in the adapter's internal representation.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanRequest {
    pub bounds: Bounds,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub requested_columns: Option<BTreeSet<String>>,
}

///
/// Adapter
///
/// One live resource instance, owned by exactly one connection.
///

pub trait Adapter: Send {
    fn columns(&self) -> &Columns;

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Extra key/value metadata about the resource.
    fn metadata(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// Relative cost of a scan with the given filters and delegated order.
    /// Must not decrease as filters or order keys are added.
    fn estimate_cost(&self, _filtered: &[(String, Operator)], _order: &[(String, Direction)]) -> f64 {
        FIXED_COST
    }

    fn get_data(&mut self, request: &ScanRequest) -> Result<RowStream<'_>, InternalError>;

    /// Store a row; `row.rowid == None` asks the adapter to assign one.
    fn insert_data(&mut self, _row: Row) -> Result<RowId, InternalError> {
        Err(InternalError::unsupported_operation("INSERT"))
    }

    fn delete_data(&mut self, _rowid: RowId) -> Result<(), InternalError> {
        Err(InternalError::unsupported_operation("DELETE"))
    }

    /// Replace the row stored under `rowid`. `row.rowid` carries the new id
    /// when the statement changed it.
    fn update_data(&mut self, _rowid: RowId, _row: Row) -> Result<(), InternalError> {
        Err(InternalError::unsupported_operation("UPDATE"))
    }

    fn drop_table(&mut self) -> Result<(), InternalError> {
        Err(InternalError::unsupported_operation("DROP TABLE"))
    }

    /// Flush and release. The core calls this exactly once.
    fn close(&mut self) -> Result<(), InternalError> {
        Ok(())
    }
}

///
/// AdapterFactory
///
/// Static side of an adapter: identification and construction.
///

pub trait AdapterFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Safe adapters never touch the local filesystem.
    fn is_safe(&self) -> bool {
        false
    }

    /// With `fast == true` no network or disk I/O is allowed; answer
    /// `Maybe` when that is not enough to decide.
    fn supports(&self, identifier: &str, fast: bool, config: &AdapterConfig) -> Support;

    /// Derive constructor arguments from the identifier. Pure.
    fn parse_identifier(&self, identifier: &str) -> Result<AdapterArgs, InternalError>;

    fn create(&self, args: &AdapterArgs, config: &AdapterConfig) -> Result<Box<dyn Adapter>, InternalError>;
}
