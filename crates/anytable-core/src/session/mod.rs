//! Module: session
//! Responsibility: a connection that plays the SQL engine's part against
//! virtual tables: table catalog, discovery on first access, statement
//! dispatch and orderly shutdown.
//! Does not own: parsing SQL; statements arrive as `query` values.
//!
//! A table that is not yet in the catalog surfaces as "no such table";
//! the connection then resolves the identifier, builds the creation
//! statement, creates the table from it and re-issues the request once.


use crate::{
    adapter::{AdapterConfig, RowId},
    dml,
    error::InternalError,
    exec::{self, QueryResult},
    field::Columns,
    plan::ExplainPlan,
    query::{Delete, Insert, Select, Update},
    registry::{AdapterRegistry, AdapterSet, Discovery, ProbeState},
    vtab::{VirtualTable, VirtualTableDefinition, strip_schema},
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

///
/// ConnectionOptions
///

#[derive(Clone, Debug, Default)]
pub struct ConnectionOptions {
    /// Safe mode: only allow-listed, safe adapters load.
    pub safe: bool,

    /// Adapter allow-list; `None` loads everything outside safe mode.
    pub adapters: Option<Vec<String>>,

    /// Keyword configuration per adapter name.
    pub adapter_config: BTreeMap<String, AdapterConfig>,
}

///
/// Connection
///
/// Owns every adapter instance it creates. Closing (or dropping) the
/// connection closes each of them exactly once.
///

pub struct Connection {
    adapters: AdapterSet,
    configs: BTreeMap<String, AdapterConfig>,
    discovery: Discovery,
    definitions: BTreeMap<String, String>,
    tables: BTreeMap<String, VirtualTable>,
    closed: bool,
}

impl Connection {
    /// Snapshot the registry according to the options and open.
    pub fn open(registry: &AdapterRegistry, options: ConnectionOptions) -> Result<Self, InternalError> {
        let adapters = registry.load(options.adapters.as_deref(), options.safe)?;
        debug!(adapters = ?adapters, safe = options.safe, "opening connection");

        Ok(Self::with_adapters(adapters, options.adapter_config))
    }

    #[must_use]
    pub fn with_adapters(adapters: AdapterSet, configs: BTreeMap<String, AdapterConfig>) -> Self {
        Self {
            adapters,
            configs,
            discovery: Discovery::new(),
            definitions: BTreeMap::new(),
            tables: BTreeMap::new(),
            closed: false,
        }
    }

    #[must_use]
    pub const fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    /// Tables created so far, by identifier.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    #[must_use]
    pub fn probe_state(&self, identifier: &str) -> ProbeState {
        self.discovery.state(strip_schema(identifier))
    }

    /// The creation statement a table was built from.
    #[must_use]
    pub fn table_definition(&self, identifier: &str) -> Option<&str> {
        self.definitions.get(strip_schema(identifier)).map(String::as_str)
    }

    pub fn select(&mut self, select: &Select) -> Result<QueryResult, InternalError> {
        exec::select(self.table(&select.table)?, select)
    }

    pub fn explain(&mut self, select: &Select) -> Result<ExplainPlan, InternalError> {
        exec::explain(self.table(&select.table)?, select)
    }

    pub fn insert(&mut self, insert: &Insert) -> Result<RowId, InternalError> {
        dml::insert(self.table(&insert.table)?, insert)
    }

    pub fn delete(&mut self, delete: &Delete) -> Result<u64, InternalError> {
        dml::delete(self.table(&delete.table)?, delete)
    }

    pub fn update(&mut self, update: &Update) -> Result<Vec<RowId>, InternalError> {
        dml::update(self.table(&update.table)?, update)
    }

    pub fn columns(&mut self, identifier: &str) -> Result<Columns, InternalError> {
        Ok(self.table(identifier)?.columns().clone())
    }

    /// Drop the resource behind a table and forget the table.
    pub fn drop_table(&mut self, identifier: &str) -> Result<(), InternalError> {
        let name = strip_schema(identifier).to_string();
        self.table(&name)?.drop_table()?;

        self.definitions.remove(&name);
        match self.tables.remove(&name) {
            Some(mut table) => table.close(),
            None => Ok(()),
        }
    }

    /// Create a table from a virtual table creation statement.
    pub fn create_virtual_table(&mut self, sql: &str) -> Result<(), InternalError> {
        self.ensure_open()?;
        let mut definition = VirtualTableDefinition::parse(sql)?;
        definition.table = strip_schema(&definition.table).to_string();
        if self.tables.contains_key(&definition.table) {
            return Err(
                InternalError::session_invalid("table already exists").with_table(definition.table.clone())
            );
        }

        let table = VirtualTable::create(&definition, &self.adapters)?;
        debug!(table = %definition.table, sql, "created virtual table");
        self.definitions.insert(definition.table.clone(), sql.to_string());
        self.tables.insert(definition.table, table);

        Ok(())
    }

    /// Close every adapter. Later calls do nothing; the first close error
    /// is returned after every table had its turn.
    pub fn close(&mut self) -> Result<(), InternalError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;
        for (_, mut table) in std::mem::take(&mut self.tables) {
            if let Err(err) = table.close() {
                warn!(table = %table.name(), error = %err.display_with_class(), "adapter close failed");
                first_error.get_or_insert(err);
            }
        }
        self.definitions.clear();

        first_error.map_or(Ok(()), Err)
    }

    fn ensure_open(&self) -> Result<(), InternalError> {
        if self.closed {
            return Err(InternalError::session_invalid("connection is closed"));
        }

        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&VirtualTable, InternalError> {
        self.tables.get(name).ok_or_else(|| InternalError::no_such_table(name))
    }

    // Catalog lookup with the discovery retry.
    fn table(&mut self, identifier: &str) -> Result<&mut VirtualTable, InternalError> {
        self.ensure_open()?;
        let name = strip_schema(identifier).to_string();

        let missing = match self.lookup(&name) {
            Ok(_) => false,
            Err(err) if err.is_no_such_table() => true,
            Err(err) => return Err(err),
        };
        if missing {
            debug!(table = %name, "no such table, running discovery");
            self.discover(&name)?;
        }

        self.tables
            .get_mut(&name)
            .ok_or_else(|| InternalError::no_such_table(name))
    }

    fn discover(&mut self, name: &str) -> Result<(), InternalError> {
        let binding = self.discovery.resolve(name, &self.adapters, &self.configs)?;
        let definition = VirtualTableDefinition {
            table: name.to_string(),
            module: binding.adapter.clone(),
            args: binding.args.clone(),
            config: binding.config.clone(),
        };

        self.create_virtual_table(&definition.to_sql()?)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err.display_with_class(), "connection close failed");
        }
    }
}
