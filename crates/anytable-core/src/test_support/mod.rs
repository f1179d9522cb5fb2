//! In-crate fixtures: a scripted adapter and factory for planner, table
//! and session tests.

use crate::{
    adapter::{
        Adapter, AdapterArgs, AdapterConfig, AdapterFactory, ArgValue, Capabilities, CostModel,
        Row, RowId, RowStream, ScanRequest, Support, filter_data,
    },
    error::InternalError,
    field::{Columns, Field},
    filter::{Direction, FilterKind, Operator, Order},
};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

///
/// Call
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Scan(ScanRequest),
    Insert(Row),
    Delete(RowId),
    Update(RowId, Row),
    Drop,
    Close,
}

pub(crate) type CallLog = Arc<Mutex<Vec<Call>>>;

///
/// FixtureAdapter
///

pub(crate) struct FixtureAdapter {
    columns: Columns,
    rows: Vec<Row>,
    capabilities: Capabilities,
    next_rowid: RowId,
    over_deliver: bool,
    cost: CostModel,
    log: CallLog,
}

impl FixtureAdapter {
    pub(crate) fn new(columns: Columns, rows: Vec<Row>) -> Self {
        let rows: Vec<Row> = rows
            .into_iter()
            .zip(0..)
            .map(|(row, id)| Row {
                rowid: Some(row.rowid.unwrap_or(id)),
                ..row
            })
            .collect();
        let next_rowid = rows.iter().filter_map(|r| r.rowid).max().map_or(0, |id| id + 1);

        Self {
            columns,
            rows,
            capabilities: Capabilities::NONE,
            next_rowid,
            over_deliver: false,
            cost: CostModel::default(),
            log: CallLog::default(),
        }
    }

    pub(crate) fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Ignore every delegated filter, order and slice.
    pub(crate) fn over_delivering(mut self) -> Self {
        self.over_deliver = true;
        self
    }

    pub(crate) fn with_cost(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    pub(crate) fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub(crate) fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }
}

impl Adapter for FixtureAdapter {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn estimate_cost(&self, filtered: &[(String, Operator)], order: &[(String, Direction)]) -> f64 {
        self.cost.estimate(filtered.len(), order.len())
    }

    fn get_data(&mut self, request: &ScanRequest) -> Result<RowStream<'_>, InternalError> {
        self.log.lock().push(Call::Scan(request.clone()));
        let rows = self.rows.clone().into_iter().map(Ok);

        if self.over_deliver {
            return Ok(Box::new(rows));
        }
        Ok(filter_data(rows, request))
    }

    fn insert_data(&mut self, row: Row) -> Result<RowId, InternalError> {
        if !self.capabilities.insert {
            return Err(InternalError::unsupported_operation("INSERT"));
        }
        self.log.lock().push(Call::Insert(row.clone()));

        let rowid = row.rowid.unwrap_or(self.next_rowid);
        self.next_rowid = self.next_rowid.max(rowid + 1);
        self.rows.push(Row {
            rowid: Some(rowid),
            ..row
        });

        Ok(rowid)
    }

    fn delete_data(&mut self, rowid: RowId) -> Result<(), InternalError> {
        if !self.capabilities.delete {
            return Err(InternalError::unsupported_operation("DELETE"));
        }
        self.log.lock().push(Call::Delete(rowid));

        let index = self
            .rows
            .iter()
            .position(|row| row.rowid == Some(rowid))
            .ok_or_else(|| InternalError::adapter_invalid(format!("row {rowid} not found")))?;
        self.rows.remove(index);

        Ok(())
    }

    fn update_data(&mut self, rowid: RowId, row: Row) -> Result<(), InternalError> {
        if !self.capabilities.update {
            return Err(InternalError::unsupported_operation("UPDATE"));
        }
        self.log.lock().push(Call::Update(rowid, row.clone()));

        let slot = self
            .rows
            .iter_mut()
            .find(|r| r.rowid == Some(rowid))
            .ok_or_else(|| InternalError::adapter_invalid(format!("row {rowid} not found")))?;
        *slot = Row {
            rowid: Some(row.rowid.unwrap_or(rowid)),
            ..row
        };

        Ok(())
    }

    fn drop_table(&mut self) -> Result<(), InternalError> {
        if !self.capabilities.drop {
            return Err(InternalError::unsupported_operation("DROP TABLE"));
        }
        self.log.lock().push(Call::Drop);
        self.rows.clear();

        Ok(())
    }

    fn close(&mut self) -> Result<(), InternalError> {
        self.log.lock().push(Call::Close);
        Ok(())
    }
}

/// `people(id, name, age)`; `age` filters inexactly with a range.
pub(crate) fn people_columns() -> Columns {
    Columns::new()
        .with(
            "id",
            Field::integer()
                .with_filters([FilterKind::Equal, FilterKind::Range])
                .with_order(Order::Ascending)
                .with_exact(true),
        )
        .with(
            "name",
            Field::text()
                .with_filters([FilterKind::Equal, FilterKind::Like])
                .with_order(Order::Any)
                .with_exact(true),
        )
        .with("age", Field::integer().with_filters([FilterKind::Range]))
}

pub(crate) fn people_rows() -> Vec<Row> {
    [(1, "alice", 34), (2, "bob", 19), (3, "carol", 52), (4, "dave", 19)]
        .into_iter()
        .map(|(id, name, age)| Row::new().with("id", id).with("name", name).with("age", age))
        .collect()
}

type Builder = Arc<dyn Fn() -> FixtureAdapter + Send + Sync>;

///
/// FixtureFactory
///

pub(crate) struct FixtureFactory {
    name: &'static str,
    safe: bool,
    fast: Support,
    slow: Support,
    claims: Option<&'static str>,
    probes: AtomicUsize,
    build: Builder,
}

impl FixtureFactory {
    /// Factory with scripted probe answers.
    pub(crate) fn scripted(name: &'static str, fast: Support, slow: Support) -> Self {
        Self {
            name,
            safe: true,
            fast,
            slow,
            claims: None,
            probes: AtomicUsize::new(0),
            build: Arc::new(|| FixtureAdapter::new(people_columns(), people_rows())),
        }
    }

    /// Factory claiming identifiers with the given prefix on the fast probe.
    pub(crate) fn claiming(
        name: &'static str,
        prefix: &'static str,
        build: impl Fn() -> FixtureAdapter + Send + Sync + 'static,
    ) -> Self {
        Self {
            claims: Some(prefix),
            build: Arc::new(build),
            ..Self::scripted(name, Support::No, Support::No)
        }
    }

    pub(crate) fn unsafe_adapter(mut self) -> Self {
        self.safe = false;
        self
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl AdapterFactory for FixtureFactory {
    fn name(&self) -> &str {
        self.name
    }

    fn is_safe(&self) -> bool {
        self.safe
    }

    fn supports(&self, identifier: &str, fast: bool, _config: &AdapterConfig) -> Support {
        self.probes.fetch_add(1, Ordering::SeqCst);

        if let Some(prefix) = self.claims {
            return if identifier.starts_with(prefix) {
                Support::Yes
            } else {
                Support::No
            };
        }

        if fast { self.fast } else { self.slow }
    }

    fn parse_identifier(&self, identifier: &str) -> Result<AdapterArgs, InternalError> {
        Ok(vec![ArgValue::from(identifier)])
    }

    fn create(&self, _args: &AdapterArgs, _config: &AdapterConfig) -> Result<Box<dyn Adapter>, InternalError> {
        Ok(Box::new((self.build)()))
    }
}
