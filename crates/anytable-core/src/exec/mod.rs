//! Module: exec
//! Responsibility: run a single-table SELECT against a virtual table and
//! complete locally whatever the adapter was not asked to do.
//! Does not own: the pushdown decision itself (see `plan`).
//!
//! Local completion happens in a fixed order: residual and inexact
//! predicates, then sorting, then offset, then limit. The limit is always
//! re-applied so an adapter that over-delivers is silently truncated.


use crate::{
    adapter::{Row, sort_rows},
    error::InternalError,
    field::Columns,
    filter::Filter,
    obs::sink::{self, MetricsEvent},
    plan::{ConstraintOp, ExplainPlan, IndexConstraint, IndexOrderBy, IndexPlan, choose_plan},
    query::{Predicate, Select},
    value::Value,
    vtab::VirtualTable,
};
use std::collections::BTreeSet;
use tracing::debug;

///
/// QueryResult
///

#[derive(Clone, Debug)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub plan: ExplainPlan,
}

///
/// PreparedScan
///
/// A SELECT resolved against a table's columns: one constraint per
/// predicate (in predicate order), then LIMIT and OFFSET when present.
///

struct PreparedScan {
    constraints: Vec<IndexConstraint>,
    values: Vec<Value>,
    filters: Vec<(String, Filter)>,
    order_by: Vec<IndexOrderBy>,
    columns_used: BTreeSet<usize>,
}

impl PreparedScan {
    fn new(columns: &Columns, select: &Select) -> Result<Self, InternalError> {
        let position = |name: &str| {
            columns
                .position(name)
                .ok_or_else(|| InternalError::session_invalid(format!("no such column: {name}")))
        };

        let mut constraints = Vec::new();
        let mut values = Vec::new();
        let mut filters = Vec::new();
        let mut columns_used = BTreeSet::new();

        for predicate in &select.predicates {
            let column = position(&predicate.column)?;
            constraints.push(IndexConstraint::compare(column, predicate.op, true));
            values.push(predicate.value.clone());
            filters.push((predicate.column.clone(), predicate.to_filter()?));
            columns_used.insert(column);
        }
        if let Some(limit) = select.limit {
            constraints.push(IndexConstraint::limit());
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        if let Some(offset) = select.offset {
            constraints.push(IndexConstraint::offset());
            values.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
        }

        let mut order_by = Vec::with_capacity(select.order_by.len());
        for (name, direction) in &select.order_by {
            let column = position(name)?;
            order_by.push(IndexOrderBy {
                column,
                direction: *direction,
            });
            columns_used.insert(column);
        }

        match &select.columns {
            Some(projection) => {
                for name in projection {
                    columns_used.insert(position(name)?);
                }
            }
            None => columns_used.extend(0..columns.len()),
        }

        Ok(Self {
            constraints,
            values,
            filters,
            order_by,
            columns_used,
        })
    }

    // Same constraints, with only point lookups left usable.
    fn point_only(&self) -> Option<Vec<IndexConstraint>> {
        let restricted: Vec<IndexConstraint> = self
            .constraints
            .iter()
            .map(|c| match c.op {
                ConstraintOp::Compare(op) if !op.is_point() => IndexConstraint { usable: false, ..*c },
                _ => *c,
            })
            .collect();

        (restricted != self.constraints).then_some(restricted)
    }

    // Fetch arguments in the order the chosen plan expects them.
    fn argv(&self, plan: &IndexPlan) -> Result<Vec<Value>, InternalError> {
        let mut argv = vec![Value::Null; plan.index.args.len()];
        for (usage, value) in plan.usage.iter().zip(&self.values) {
            if let Some(usage) = usage {
                let slot = argv.get_mut(usage.argv_index).ok_or_else(|| {
                    InternalError::planner_invariant(format!("argument slot {} out of range", usage.argv_index))
                })?;
                *slot = value.clone();
            }
        }

        Ok(argv)
    }

    // Predicates the engine still evaluates: not delegated, or delegated to
    // an inexact column.
    fn residual<'a>(&'a self, plan: &IndexPlan) -> Vec<&'a (String, Filter)> {
        self.filters
            .iter()
            .zip(&plan.usage)
            .filter(|(_, usage)| usage.is_none_or(|u| !u.omit))
            .map(|(filter, _)| filter)
            .collect()
    }
}

fn plan_scan(table: &VirtualTable, prepared: &PreparedScan) -> Result<IndexPlan, InternalError> {
    let columns_used = Some(&prepared.columns_used);
    let mut candidates = vec![table.best_index(&prepared.constraints, &prepared.order_by, columns_used)?];
    if let Some(restricted) = prepared.point_only() {
        candidates.push(table.best_index(&restricted, &prepared.order_by, columns_used)?);
    }

    choose_plan(candidates).ok_or_else(|| InternalError::planner_invariant("no candidate plan"))
}

/// Describe how a SELECT would run without fetching anything.
pub fn explain(table: &VirtualTable, select: &Select) -> Result<ExplainPlan, InternalError> {
    let prepared = PreparedScan::new(table.columns(), select).map_err(|err| err.with_table(table.name()))?;
    let plan = plan_scan(table, &prepared)?;

    Ok(table.explain(&prepared.constraints, &plan))
}

/// Plan, fetch and complete one SELECT.
pub fn select(table: &mut VirtualTable, select: &Select) -> Result<QueryResult, InternalError> {
    let prepared = PreparedScan::new(table.columns(), select).map_err(|err| err.with_table(table.name()))?;
    let plan = plan_scan(table, &prepared)?;
    let explain = table.explain(&prepared.constraints, &plan);

    let argv = prepared.argv(&plan)?;
    let residual = prepared.residual(&plan);
    let sort_required = !plan.order_consumed;
    let offset = if plan.offset_delegated() {
        0
    } else {
        to_usize(select.offset.unwrap_or(0))
    };
    let limit = select.limit.map(to_usize);
    let streaming_done = |rows: &[Row]| !sort_required && limit.is_some_and(|limit| rows.len() >= limit);

    let mut rows = Vec::new();
    let mut rejected = 0_u64;
    let mut skipped = 0_usize;
    let table_name = table.name().to_string();
    if !streaming_done(&rows) {
        let cursor = table.rows(&plan.index, &argv)?;
        for row in cursor {
            let row = row?;
            if !residual.iter().all(|(column, filter)| filter.check(row.get(column))) {
                rejected = rejected.saturating_add(1);
                continue;
            }
            if !sort_required && skipped < offset {
                skipped += 1;
                continue;
            }

            rows.push(row);
            if streaming_done(&rows) {
                break;
            }
        }
    }

    if sort_required {
        sort_rows(&mut rows, &select.order_by);
        rows.drain(..offset.min(rows.len()));
    }
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    if let Some(projection) = &select.columns {
        for row in &mut rows {
            row.values.retain(|column, _| projection.contains(column));
        }
    }

    if rejected > 0 {
        sink::record(MetricsEvent::RowsFiltered {
            table: &table_name,
            rows: rejected,
        });
    }
    debug!(table = %table_name, rows = rows.len(), rejected, sort_required, "scan complete");

    Ok(QueryResult { rows, plan: explain })
}

/// Complete rows (rowid included) matching every predicate; the read half
/// of DELETE and UPDATE.
pub(crate) fn matching_rows(
    table: &mut VirtualTable,
    predicates: &[Predicate],
) -> Result<Vec<Row>, InternalError> {
    let select = Select {
        table: table.name().to_string(),
        predicates: predicates.to_vec(),
        ..Select::default()
    };

    Ok(self::select(table, &select)?.rows)
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
