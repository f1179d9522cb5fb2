//! Metrics sink boundary.
//!
//! Planner, session and DML code never touch `obs::metrics` directly; all
//! instrumentation flows through `MetricsEvent` and `MetricsSink`.

use crate::obs::metrics;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MutationKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MutationKind {
    Insert,
    Delete,
    Update,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent<'a> {
    Discovery {
        identifier: &'a str,
        adapter: &'a str,
        slow_probe: bool,
    },
    Plan {
        table: &'a str,
        pushed_filters: u64,
        residual_filters: u64,
        sort_required: bool,
        limit_delegated: bool,
        offset_delegated: bool,
        estimated_cost: f64,
    },
    RowsFetched {
        table: &'a str,
        rows: u64,
    },
    RowsFiltered {
        table: &'a str,
        rows: u64,
    },
    Mutation {
        table: &'a str,
        kind: MutationKind,
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread's counter state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::Discovery { slow_probe, .. } => metrics::with_state_mut(|m| {
                m.ops.discoveries = m.ops.discoveries.saturating_add(1);
                if slow_probe {
                    m.ops.slow_probes = m.ops.slow_probes.saturating_add(1);
                }
            }),

            MetricsEvent::Plan {
                table,
                pushed_filters,
                residual_filters,
                sort_required,
                limit_delegated,
                ..
            } => metrics::with_state_mut(|m| {
                m.ops.plans = m.ops.plans.saturating_add(1);
                m.ops.pushed_filters = m.ops.pushed_filters.saturating_add(pushed_filters);
                m.ops.residual_filters = m.ops.residual_filters.saturating_add(residual_filters);
                if sort_required {
                    m.ops.local_sorts = m.ops.local_sorts.saturating_add(1);
                }
                if limit_delegated {
                    m.ops.limits_delegated = m.ops.limits_delegated.saturating_add(1);
                }

                let entry = m.tables.entry(table.to_string()).or_default();
                entry.plans = entry.plans.saturating_add(1);
            }),

            MetricsEvent::RowsFetched { table, rows } => metrics::with_state_mut(|m| {
                m.ops.rows_fetched = m.ops.rows_fetched.saturating_add(rows);
                let entry = m.tables.entry(table.to_string()).or_default();
                entry.rows_fetched = entry.rows_fetched.saturating_add(rows);
            }),

            MetricsEvent::RowsFiltered { table, rows } => metrics::with_state_mut(|m| {
                m.ops.rows_filtered = m.ops.rows_filtered.saturating_add(rows);
                let entry = m.tables.entry(table.to_string()).or_default();
                entry.rows_filtered = entry.rows_filtered.saturating_add(rows);
            }),

            MetricsEvent::Mutation { table, kind, rows } => metrics::with_state_mut(|m| {
                let entry = m.tables.entry(table.to_string()).or_default();
                match kind {
                    MutationKind::Insert => {
                        m.ops.inserts = m.ops.inserts.saturating_add(rows);
                        entry.inserts = entry.inserts.saturating_add(rows);
                    }
                    MutationKind::Delete => {
                        m.ops.deletes = m.ops.deletes.saturating_add(rows);
                        entry.deletes = entry.deletes.saturating_add(rows);
                    }
                    MutationKind::Update => {
                        m.ops.updates = m.ops.updates.saturating_add(rows);
                        entry.updates = entry.updates.saturating_add(rows);
                    }
                }
            }),
        }
    }
}

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current thread's counters.
#[must_use]
pub fn metrics_report() -> metrics::EventState {
    metrics::with_state(Clone::clone)
}

pub fn metrics_reset() {
    metrics::reset();
}

/// Run a closure with a temporary metrics sink override.
///
/// The previous sink is restored on every exit, unwinding included.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}
