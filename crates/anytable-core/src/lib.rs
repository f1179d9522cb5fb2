//! Core runtime for anytable: the adapter contract, field conversion,
//! filter pushdown planning, virtual tables, and a connection that
//! completes locally whatever an adapter cannot do.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod adapter;
pub mod dml;
pub mod error;
pub mod exec;
pub mod field;
pub mod filter;
pub mod marshal;
pub mod obs;
pub mod plan;
pub mod query;
pub mod registry;
pub mod session;
pub mod value;
pub mod vtab;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Vocabulary for writing adapters and issuing statements.
/// No planner internals or metrics plumbing are re-exported here.
///

pub mod prelude {
    pub use crate::{
        adapter::{
            Adapter, AdapterArgs, AdapterConfig, AdapterFactory, ArgValue, Capabilities, Row, RowId,
            RowStream, ScanRequest, Support,
        },
        error::InternalError,
        field::{Columns, Field},
        filter::{Direction, FilterKind, Operator, Order},
        query::{Delete, Insert, Predicate, Select, Update},
        session::{Connection, ConnectionOptions},
        value::Value,
    };
}
