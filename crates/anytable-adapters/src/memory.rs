//! Module: memory
//! Responsibility: tables held in process memory, addressed as
//! `memory://<name>`.
//! Does not own: persistence; a store lives as long as its factory.
//!
//! Every column filters exactly, sorts on request and accepts writes, so
//! the planner can push an entire statement down to this adapter.

use anytable_core::{
    adapter::{
        Adapter, AdapterArgs, AdapterConfig, AdapterFactory, ArgValue, Capabilities, Row, RowId,
        RowStream, ScanRequest, Support, filter_data,
    },
    error::InternalError,
    field::{Columns, Field, FieldKind},
    filter::{FilterKind, Order},
    value::Value,
};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

pub const SCHEME: &str = "memory://";

///
/// MemoryTable
///

#[derive(Clone, Debug)]
struct MemoryTable {
    columns: Columns,
    rows: Vec<Row>,
    next: RowId,
}

impl MemoryTable {
    fn new(columns: Columns, rows: impl IntoIterator<Item = Row>) -> Self {
        let mut table = Self {
            columns,
            rows: Vec::new(),
            next: 0,
        };
        for row in rows {
            let rowid = row.rowid.unwrap_or(table.next);
            table.next = table.next.max(rowid.saturating_add(1));
            table.rows.push(Row {
                rowid: Some(rowid),
                ..row
            });
        }

        table
    }

    fn position(&self, rowid: RowId) -> Result<usize, InternalError> {
        self.rows
            .iter()
            .position(|row| row.rowid == Some(rowid))
            .ok_or_else(|| InternalError::adapter_invalid(format!("row ID {rowid} not found")))
    }

    fn contains(&self, rowid: RowId) -> bool {
        self.rows.iter().any(|row| row.rowid == Some(rowid))
    }
}

///
/// MemoryStore
///
/// Named tables shared by every adapter instance a factory creates.
/// Cloning the store clones the handle, not the tables.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<BTreeMap<String, MemoryTable>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a table. Rows without a rowid are numbered after
    /// the highest one seen so far.
    pub fn define<S: Into<String>>(
        &self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (S, FieldKind)>,
        rows: impl IntoIterator<Item = Row>,
    ) {
        let columns = columns
            .into_iter()
            .map(|(column, kind)| (column, memory_field(kind)))
            .collect();

        self.tables
            .write()
            .insert(name.into(), MemoryTable::new(columns, rows));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Copy of the stored rows, in storage order.
    #[must_use]
    pub fn rows(&self, name: &str) -> Option<Vec<Row>> {
        self.tables.read().get(name).map(|table| table.rows.clone())
    }

    fn columns(&self, name: &str) -> Option<Columns> {
        self.tables.read().get(name).map(|table| table.columns.clone())
    }

    fn with_table<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut MemoryTable) -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(name).ok_or_else(|| missing_table(name))?;

        f(table)
    }

    fn remove(&self, name: &str) -> bool {
        self.tables.write().remove(name).is_some()
    }
}

/// The id after `rowid`; the largest id cannot be stored because nothing
/// could follow it.
fn successor(rowid: RowId) -> Result<RowId, InternalError> {
    rowid
        .checked_add(1)
        .ok_or_else(|| InternalError::adapter_invalid(format!("row ID {rowid} is out of range")))
}

fn missing_table(name: &str) -> InternalError {
    InternalError::adapter_io(format!("memory table '{name}' does not exist"))
}

/// Field declaring every family that makes sense for the kind.
fn memory_field(kind: FieldKind) -> Field {
    let mut filters = vec![
        FilterKind::Range,
        FilterKind::Equal,
        FilterKind::NotEqual,
        FilterKind::IsNull,
        FilterKind::IsNotNull,
    ];
    if kind == FieldKind::Text {
        filters.push(FilterKind::Like);
    }

    Field::native(kind)
        .with_filters(filters)
        .with_order(Order::Any)
        .with_exact(true)
}

///
/// MemoryAdapter
///

pub struct MemoryAdapter {
    name: String,
    columns: Columns,
    store: MemoryStore,
}

impl Adapter for MemoryAdapter {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with_limit_offset()
            .with_requested_columns()
            .with_insert_delete()
            .with_update()
            .with_drop()
    }

    fn metadata(&self) -> BTreeMap<String, Value> {
        let rows = self
            .store
            .rows(&self.name)
            .map_or(0, |rows| i64::try_from(rows.len()).unwrap_or(i64::MAX));

        BTreeMap::from([("rows".to_string(), Value::Integer(rows))])
    }

    fn get_data(&mut self, request: &ScanRequest) -> Result<RowStream<'_>, InternalError> {
        let rows = self
            .store
            .rows(&self.name)
            .ok_or_else(|| missing_table(&self.name))?;

        Ok(filter_data(rows.into_iter().map(Ok), request))
    }

    fn insert_data(&mut self, row: Row) -> Result<RowId, InternalError> {
        self.store.with_table(&self.name, |table| {
            let rowid = row.rowid.unwrap_or(table.next);
            if table.contains(rowid) {
                return Err(InternalError::adapter_invalid(format!(
                    "row ID {rowid} already present"
                )));
            }
            table.next = table.next.max(successor(rowid)?);
            table.rows.push(Row {
                rowid: Some(rowid),
                ..row
            });

            Ok(rowid)
        })
    }

    fn delete_data(&mut self, rowid: RowId) -> Result<(), InternalError> {
        self.store.with_table(&self.name, |table| {
            let index = table.position(rowid)?;
            table.rows.remove(index);

            Ok(())
        })
    }

    fn update_data(&mut self, rowid: RowId, row: Row) -> Result<(), InternalError> {
        self.store.with_table(&self.name, |table| {
            let index = table.position(rowid)?;
            let target = row.rowid.unwrap_or(rowid);
            if target != rowid && table.contains(target) {
                return Err(InternalError::adapter_invalid(format!(
                    "row ID {target} already present"
                )));
            }
            table.next = table.next.max(successor(target)?);
            table.rows[index] = Row {
                rowid: Some(target),
                ..row
            };

            Ok(())
        })
    }

    fn drop_table(&mut self) -> Result<(), InternalError> {
        if !self.store.remove(&self.name) {
            return Err(missing_table(&self.name));
        }
        debug!(table = %self.name, "dropped memory table");

        Ok(())
    }
}

///
/// MemoryFactory
///
/// Claims `memory://<name>` when the store holds the table or the
/// adapter configuration defines it under `tables`:
///
/// ```toml
/// [adapter.memory.tables.people]
/// id = "INTEGER"
/// name = "TEXT"
/// ```
///

#[derive(Debug, Default)]
pub struct MemoryFactory {
    store: MemoryStore,
}

impl MemoryFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_store(store: MemoryStore) -> Self {
        Self { store }
    }

    /// Builder form of `MemoryStore::define`.
    #[must_use]
    pub fn with_table<S: Into<String>>(
        self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (S, FieldKind)>,
        rows: impl IntoIterator<Item = Row>,
    ) -> Self {
        self.store.define(name, columns, rows);
        self
    }

    #[must_use]
    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }
}

fn table_name(identifier: &str) -> Option<&str> {
    identifier
        .strip_prefix(SCHEME)
        .filter(|name| !name.is_empty())
}

/// Column definitions for `name` from the `tables` configuration key.
fn configured_columns(
    config: &AdapterConfig,
    name: &str,
) -> Result<Option<Vec<(String, FieldKind)>>, InternalError> {
    let Some(tables) = config.get("tables") else {
        return Ok(None);
    };
    let tables = tables
        .as_map()
        .ok_or_else(|| InternalError::adapter_invalid("memory: `tables` must map names to column tables"))?;
    let Some(definition) = tables.get(name) else {
        return Ok(None);
    };
    let definition = definition.as_map().ok_or_else(|| {
        InternalError::adapter_invalid(format!("memory table '{name}': columns must be a table"))
    })?;

    definition
        .iter()
        .map(|(column, kind)| {
            let kind = kind
                .as_str()
                .and_then(FieldKind::from_type_name)
                .ok_or_else(|| {
                    InternalError::adapter_invalid(format!(
                        "memory table '{name}': unknown type for column '{column}'"
                    ))
                })?;
            Ok::<_, InternalError>((column.clone(), kind))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

impl AdapterFactory for MemoryFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_safe(&self) -> bool {
        true
    }

    fn supports(&self, identifier: &str, _fast: bool, config: &AdapterConfig) -> Support {
        let Some(name) = table_name(identifier) else {
            return Support::No;
        };

        if self.store.contains(name) || matches!(configured_columns(config, name), Ok(Some(_))) {
            Support::Yes
        } else {
            Support::No
        }
    }

    fn parse_identifier(&self, identifier: &str) -> Result<AdapterArgs, InternalError> {
        let name = table_name(identifier).ok_or_else(|| {
            InternalError::adapter_invalid(format!("not a memory table identifier: {identifier}"))
        })?;

        Ok(vec![ArgValue::from(name)])
    }

    fn create(&self, args: &AdapterArgs, config: &AdapterConfig) -> Result<Box<dyn Adapter>, InternalError> {
        let name = args
            .first()
            .and_then(ArgValue::as_str)
            .ok_or_else(|| InternalError::adapter_invalid("memory: expected a table name argument"))?;

        if !self.store.contains(name) {
            let columns = configured_columns(config, name)?.ok_or_else(|| missing_table(name))?;
            debug!(table = %name, "defining memory table from configuration");
            self.store.define(name, columns, []);
        }
        let columns = self.store.columns(name).ok_or_else(|| missing_table(name))?;
        debug!(table = %name, columns = columns.len(), "opening memory table");

        Ok(Box::new(MemoryAdapter {
            name: name.to_string(),
            columns,
            store: self.store.clone(),
        }))
    }
}

///
/// TESTS
///
