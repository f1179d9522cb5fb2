//! Module: vtab
//! Responsibility: one virtual table bound to one adapter instance, speaking
//! the engine's table protocol (columns, planning, cursors, mutations).
//! Does not own: statement execution or local completion (see `exec`).
//!
//! Values cross this boundary in engine form on the way in and out; the
//! adapter only ever sees its internal representation.

mod ddl;

#[cfg(test)]
mod tests;

pub use ddl::{VirtualTableDefinition, quote_identifier, strip_schema};

use crate::{
    adapter::{Adapter, Capabilities, Row, RowId, RowStream, ScanRequest},
    error::InternalError,
    field::Columns,
    filter::{Direction, Operator},
    obs::sink::{self, MetricsEvent, MutationKind},
    plan::{self, ExplainPlan, IndexConstraint, IndexOrderBy, IndexPlan, IndexSpec, PlanInput},
    registry::AdapterSet,
    value::Value,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

///
/// VirtualTable
///

pub struct VirtualTable {
    name: String,
    adapter: Box<dyn Adapter>,
    closed: bool,
}

impl VirtualTable {
    pub fn new(name: impl Into<String>, adapter: Box<dyn Adapter>) -> Result<Self, InternalError> {
        let name = name.into();
        if adapter.columns().is_empty() {
            return Err(InternalError::adapter_invalid("adapter declared no columns").with_table(name));
        }

        Ok(Self {
            name,
            adapter,
            closed: false,
        })
    }

    /// Instantiate the adapter a creation statement names.
    pub fn create(definition: &VirtualTableDefinition, adapters: &AdapterSet) -> Result<Self, InternalError> {
        let factory = adapters
            .get(&definition.module)
            .ok_or_else(|| InternalError::no_adapter_found(definition.table.clone()))?;
        let adapter = factory
            .create(&definition.args, &definition.config)
            .map_err(|err| err.with_table(definition.table.clone()))?;
        debug!(table = %definition.table, adapter = %definition.module, "adapter instantiated");

        Self::new(definition.table.clone(), adapter)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &Columns {
        self.adapter.columns()
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.adapter.capabilities()
    }

    #[must_use]
    pub fn metadata(&self) -> BTreeMap<String, Value> {
        self.adapter.metadata()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Column declaration handed to the engine.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.field.type_name()))
            .collect();

        format!("CREATE TABLE {} ({})", quote_identifier(&self.name), columns.join(", "))
    }

    #[must_use]
    pub fn cost(&self, filtered: &[(String, Operator)], order: &[(String, Direction)]) -> f64 {
        self.adapter.estimate_cost(filtered, order)
    }

    pub fn best_index(
        &self,
        constraints: &[IndexConstraint],
        order_by: &[IndexOrderBy],
        columns_used: Option<&BTreeSet<usize>>,
    ) -> Result<IndexPlan, InternalError> {
        plan::best_index(
            self.adapter.as_ref(),
            &PlanInput {
                constraints,
                order_by,
                columns_used,
            },
        )
        .map_err(|err| err.with_table(self.name.as_str()))
    }

    /// Describe a chosen plan and report it to the metrics sink.
    pub fn explain(&self, constraints: &[IndexConstraint], plan: &IndexPlan) -> ExplainPlan {
        let explain = ExplainPlan::new(&self.name, self.columns(), constraints, plan);
        sink::record(MetricsEvent::Plan {
            table: &self.name,
            pushed_filters: explain.pushed.len() as u64,
            residual_filters: explain.residual.len() as u64,
            sort_required: explain.sort_required,
            limit_delegated: plan.limit_delegated(),
            offset_delegated: plan.offset_delegated(),
            estimated_cost: plan.estimated_cost,
        });

        explain
    }

    /// Open a cursor for a planned index and the engine's argument values.
    pub fn rows(&mut self, index: &IndexSpec, args: &[Value]) -> Result<Cursor<'_>, InternalError> {
        let columns = self.adapter.columns().clone();
        let request = plan::build_scan_request(&columns, index, args).map_err(|err| err.with_table(self.name.as_str()))?;
        self.open(columns, &request)
    }

    /// Open a cursor for an already-built request.
    pub fn scan(&mut self, request: &ScanRequest) -> Result<Cursor<'_>, InternalError> {
        let columns = self.adapter.columns().clone();
        self.open(columns, request)
    }

    fn open(&mut self, columns: Columns, request: &ScanRequest) -> Result<Cursor<'_>, InternalError> {
        self.ensure_open()?;
        let stream = self
            .adapter
            .get_data(request)
            .map_err(|err| err.with_table(self.name.as_str()))?;

        Ok(Cursor {
            table: &self.name,
            columns,
            stream,
            fetched: 0,
        })
    }

    /// Store a row given in engine form. Returns the rowid the adapter
    /// assigned or kept.
    pub fn insert_row(&mut self, row: Row) -> Result<RowId, InternalError> {
        self.ensure_open()?;
        if !self.capabilities().insert {
            return Err(InternalError::unsupported_operation("INSERT").with_table(self.name.as_str()));
        }

        let row = self.to_internal(row)?;
        let rowid = self
            .adapter
            .insert_data(row)
            .map_err(|err| err.with_table(self.name.as_str()))?;
        self.record_mutation(MutationKind::Insert);

        Ok(rowid)
    }

    pub fn delete_row(&mut self, rowid: RowId) -> Result<(), InternalError> {
        self.ensure_open()?;
        if !self.capabilities().delete {
            return Err(InternalError::unsupported_operation("DELETE").with_table(self.name.as_str()));
        }

        self.adapter
            .delete_data(rowid)
            .map_err(|err| err.with_table(self.name.as_str()))?;
        self.record_mutation(MutationKind::Delete);

        Ok(())
    }

    /// Replace the row under `rowid` with a complete row in engine form.
    ///
    /// Adapters without a native update get a delete followed by an
    /// insert that lets them assign a fresh rowid, which is returned.
    pub fn update_row(&mut self, rowid: RowId, row: Row) -> Result<RowId, InternalError> {
        self.ensure_open()?;
        let capabilities = self.capabilities();
        let row = self.to_internal(row)?;

        let new_rowid = if capabilities.update {
            let new_rowid = row.rowid.unwrap_or(rowid);
            self.adapter
                .update_data(rowid, row)
                .map_err(|err| err.with_table(self.name.as_str()))?;
            new_rowid
        } else if capabilities.delete && capabilities.insert {
            debug!(table = %self.name, rowid, "update as delete + insert");
            self.adapter
                .delete_data(rowid)
                .map_err(|err| err.with_table(self.name.as_str()))?;
            self.adapter
                .insert_data(Row { rowid: None, ..row })
                .map_err(|err| err.with_table(self.name.as_str()))?
        } else {
            return Err(InternalError::unsupported_operation("UPDATE").with_table(self.name.as_str()));
        };
        self.record_mutation(MutationKind::Update);

        Ok(new_rowid)
    }

    pub fn drop_table(&mut self) -> Result<(), InternalError> {
        self.ensure_open()?;
        if !self.capabilities().drop {
            return Err(InternalError::unsupported_operation("DROP TABLE").with_table(self.name.as_str()));
        }

        self.adapter
            .drop_table()
            .map_err(|err| err.with_table(self.name.as_str()))
    }

    /// Flush and release the adapter. Later calls do nothing.
    pub fn close(&mut self) -> Result<(), InternalError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(table = %self.name, "closing adapter");

        self.adapter.close().map_err(|err| err.with_table(self.name.as_str()))
    }

    fn ensure_open(&self) -> Result<(), InternalError> {
        if self.closed {
            return Err(InternalError::session_invalid("table is closed").with_table(self.name.as_str()));
        }

        Ok(())
    }

    fn to_internal(&self, row: Row) -> Result<Row, InternalError> {
        let columns = self.columns();
        let mut values = BTreeMap::new();
        for (name, value) in row.values {
            if columns.get(&name).is_none() {
                return Err(InternalError::session_invalid(format!("no such column: {name}")).with_table(self.name.as_str()));
            }
            let internal = columns
                .format_value(&name, value)
                .map_err(|err| InternalError::from(err).with_table(self.name.as_str()))?;
            values.insert(name, internal);
        }

        Ok(Row {
            rowid: row.rowid,
            values,
        })
    }

    fn record_mutation(&self, kind: MutationKind) {
        sink::record(MetricsEvent::Mutation {
            table: &self.name,
            kind,
            rows: 1,
        });
    }
}

impl Drop for VirtualTable {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(table = %self.name, error = %err.display_with_class(), "adapter close failed");
        }
    }
}

///
/// Cursor
///
/// Lazy stream of rows in engine form. Dropping it early releases the
/// adapter stream; the number of rows actually pulled is reported then.
///

pub struct Cursor<'a> {
    table: &'a str,
    columns: Columns,
    stream: RowStream<'a>,
    fetched: u64,
}

impl Cursor<'_> {
    #[must_use]
    pub const fn fetched(&self) -> u64 {
        self.fetched
    }

    fn convert(&self, row: Row) -> Result<Row, InternalError> {
        let mut values = BTreeMap::new();
        for (name, internal) in row.values {
            let external = self
                .columns
                .parse_value(&name, internal)
                .map_err(|err| InternalError::from(err).with_table(self.table))?;
            values.insert(name, external);
        }

        Ok(Row {
            rowid: row.rowid,
            values,
        })
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Row, InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.stream.next()? {
            Ok(row) => row,
            Err(err) => return Some(Err(err.with_table(self.table))),
        };
        self.fetched = self.fetched.saturating_add(1);

        Some(self.convert(row))
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        sink::record(MetricsEvent::RowsFetched {
            table: self.table,
            rows: self.fetched,
        });
    }
}
