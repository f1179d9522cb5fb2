//! Module: plan
//! Responsibility: decide which predicates, ordering and slicing an adapter
//! receives, and rebuild the adapter request from the engine's arguments.
//! Does not own: executing the scan or completing it locally (see `exec`).
//!
//! Planning happens in two steps, mirroring a virtual-table protocol:
//! `best_index` runs once per candidate plan with only the shape of the
//! constraints, and `build_scan_request` runs at fetch time with the
//! actual constraint values.

mod bounds;
mod explain;

#[cfg(test)]
mod tests;

pub use bounds::build_scan_request;
pub use explain::{ExplainPlan, ExplainPredicate, ExplainSlice};

use crate::{
    adapter::Adapter,
    error::InternalError,
    field::Columns,
    filter::{Direction, FilterKind, Operator, Order},
};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};
use tracing::debug;

///
/// ConstraintOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstraintOp {
    Compare(Operator),
    Limit,
    Offset,
}

///
/// IndexConstraint
///
/// One WHERE term (or LIMIT / OFFSET) as the engine describes it before
/// values are known. `usable == false` means the engine cannot supply the
/// value for this plan.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexConstraint {
    pub column: Option<usize>,
    pub op: ConstraintOp,
    pub usable: bool,
}

impl IndexConstraint {
    #[must_use]
    pub const fn compare(column: usize, op: Operator, usable: bool) -> Self {
        Self {
            column: Some(column),
            op: ConstraintOp::Compare(op),
            usable,
        }
    }

    #[must_use]
    pub const fn limit() -> Self {
        Self {
            column: None,
            op: ConstraintOp::Limit,
            usable: true,
        }
    }

    #[must_use]
    pub const fn offset() -> Self {
        Self {
            column: None,
            op: ConstraintOp::Offset,
            usable: true,
        }
    }
}

///
/// IndexOrderBy
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexOrderBy {
    pub column: usize,
    pub direction: Direction,
}

///
/// ConstraintUsage
///
/// Where the constraint's value lands in the fetch arguments, and whether
/// the engine may skip re-checking it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConstraintUsage {
    pub argv_index: usize,
    pub omit: bool,
}

///
/// PlannedArg
///
/// Meaning of one fetch argument.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlannedArg {
    Filter { column: usize, op: Operator },
    Limit,
    Offset,

    /// Offset the engine still applies itself; the adapter only needs it
    /// to widen a delegated limit.
    OffsetForLimit,
}

///
/// IndexSpec
///
/// The opaque index handed back at fetch time.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexSpec {
    pub args: Vec<PlannedArg>,
    pub order: Vec<(usize, Direction)>,
    pub requested_columns: Option<Vec<String>>,
}

impl IndexSpec {
    pub fn encode(&self) -> Result<String, InternalError> {
        serde_json::to_string(self)
            .map_err(|err| InternalError::planner_invariant(format!("cannot encode index: {err}")))
    }

    pub fn decode(index: &str) -> Result<Self, InternalError> {
        serde_json::from_str(index)
            .map_err(|err| InternalError::planner_invalid(format!("malformed index '{index}': {err}")))
    }

    /// Number of delegated column predicates.
    #[must_use]
    pub fn pushed_filters(&self) -> usize {
        self.args
            .iter()
            .filter(|arg| matches!(arg, PlannedArg::Filter { .. }))
            .count()
    }

    #[must_use]
    pub fn delegates(&self, arg: PlannedArg) -> bool {
        self.args.contains(&arg)
    }
}

///
/// IndexPlan
///
/// One candidate plan: constraint usage parallel to the input
/// constraints, the index to replay at fetch time, and its cost.
///

#[derive(Clone, Debug, PartialEq)]
pub struct IndexPlan {
    pub usage: Vec<Option<ConstraintUsage>>,
    pub index: IndexSpec,
    pub order_consumed: bool,
    pub estimated_cost: f64,
}

impl IndexPlan {
    #[must_use]
    pub fn pushed_filters(&self) -> usize {
        self.index.pushed_filters()
    }

    #[must_use]
    pub fn limit_delegated(&self) -> bool {
        self.index.delegates(PlannedArg::Limit)
    }

    #[must_use]
    pub fn offset_delegated(&self) -> bool {
        self.index.delegates(PlannedArg::Offset)
    }
}

///
/// PlanInput
///

#[derive(Clone, Copy, Debug)]
pub struct PlanInput<'a> {
    pub constraints: &'a [IndexConstraint],
    pub order_by: &'a [IndexOrderBy],
    pub columns_used: Option<&'a BTreeSet<usize>>,
}

/// Plan one candidate against an adapter.
pub fn best_index(adapter: &dyn Adapter, input: &PlanInput<'_>) -> Result<IndexPlan, InternalError> {
    let columns = adapter.columns();
    let capabilities = adapter.capabilities();

    for constraint in input.constraints {
        if let Some(column) = constraint.column
            && columns.column(column).is_none()
        {
            return Err(InternalError::planner_invalid(format!(
                "constraint references unknown column #{column}"
            )));
        }
    }

    let handled = handled_constraints(columns, input.constraints);
    let exact = |column: usize| columns.column(column).is_some_and(|c| c.field.is_exact());

    let whole_predicate = input
        .constraints
        .iter()
        .zip(&handled)
        .filter(|(c, _)| matches!(c.op, ConstraintOp::Compare(_)))
        .all(|(c, handled)| *handled && c.column.is_some_and(exact));

    let (order, order_consumed) = plan_order(columns, input.order_by)?;

    let can_slice = whole_predicate && order_consumed;
    let has = |op: ConstraintOp| input.constraints.iter().any(|c| c.op == op && c.usable);
    let delegate_limit = can_slice && capabilities.limit && has(ConstraintOp::Limit);
    let delegate_offset = can_slice && capabilities.offset && has(ConstraintOp::Offset);

    let mut args = Vec::new();
    let mut usage = Vec::with_capacity(input.constraints.len());
    let mut filtered = Vec::new();
    for (constraint, handled) in input.constraints.iter().zip(handled) {
        let planned = match (constraint.column, constraint.op) {
            (Some(column), ConstraintOp::Compare(op)) if handled => {
                if let Some(c) = columns.column(column) {
                    filtered.push((c.name.clone(), op));
                }
                Some((PlannedArg::Filter { column, op }, exact(column)))
            }
            (_, ConstraintOp::Limit) if delegate_limit && constraint.usable => Some((PlannedArg::Limit, true)),
            (_, ConstraintOp::Offset) if delegate_offset && constraint.usable => Some((PlannedArg::Offset, true)),
            (_, ConstraintOp::Offset) if delegate_limit && constraint.usable => {
                Some((PlannedArg::OffsetForLimit, false))
            }
            _ => None,
        };

        usage.push(planned.map(|(arg, omit)| {
            args.push(arg);
            ConstraintUsage {
                argv_index: args.len() - 1,
                omit,
            }
        }));
    }

    let order_names: Vec<(String, Direction)> = order
        .iter()
        .filter_map(|(column, direction)| columns.column(*column).map(|c| (c.name.clone(), *direction)))
        .collect();
    let estimated_cost = adapter.estimate_cost(&filtered, &order_names);

    let requested_columns = match (capabilities.requested_columns, input.columns_used) {
        (true, Some(used)) => Some(
            used.iter()
                .filter_map(|i| columns.column(*i).map(|c| c.name.clone()))
                .collect(),
        ),
        _ => None,
    };

    let plan = IndexPlan {
        usage,
        index: IndexSpec {
            args,
            order,
            requested_columns,
        },
        order_consumed,
        estimated_cost,
    };
    debug!(
        pushed = plan.pushed_filters(),
        order_consumed,
        limit = plan.limit_delegated(),
        offset = plan.offset_delegated(),
        cost = estimated_cost,
        "planned candidate"
    );

    Ok(plan)
}

// Per column, the declared family that covers the most of the column's
// usable operators. Declaration order breaks ties.
fn choose_families(columns: &Columns, constraints: &[IndexConstraint]) -> BTreeMap<usize, FilterKind> {
    let mut operators: BTreeMap<usize, Vec<Operator>> = BTreeMap::new();
    for constraint in constraints.iter().filter(|c| c.usable) {
        if let (Some(column), ConstraintOp::Compare(op)) = (constraint.column, constraint.op) {
            operators.entry(column).or_default().push(op);
        }
    }

    operators
        .into_iter()
        .filter_map(|(column, ops)| {
            let field = &columns.column(column)?.field;
            let mut best: Option<(FilterKind, usize)> = None;
            for kind in field.filters() {
                let mut covered = ops.iter().filter(|op| kind.accepts(**op)).count();
                if !kind.combines() {
                    covered = covered.min(1);
                }
                if covered > 0 && best.is_none_or(|(_, n)| covered > n) {
                    best = Some((*kind, covered));
                }
            }
            best.map(|(kind, _)| (column, kind))
        })
        .collect()
}

// Which constraints the adapter evaluates, parallel to `constraints`.
// Families that cannot fold several constraints take only the first one
// on their column.
fn handled_constraints(columns: &Columns, constraints: &[IndexConstraint]) -> Vec<bool> {
    let families = choose_families(columns, constraints);
    let mut taken = BTreeSet::new();

    constraints
        .iter()
        .map(|c| match (c.column, c.op) {
            (Some(column), ConstraintOp::Compare(op)) if c.usable => {
                let Some(kind) = families.get(&column).filter(|kind| kind.accepts(op)) else {
                    return false;
                };
                kind.combines() || taken.insert(column)
            }
            _ => false,
        })
        .collect()
}

// Requested order against declared guarantees: all-`Any` is delegated,
// all-static-and-matching is already satisfied, anything else is sorted
// by the engine and nothing is delegated.
fn plan_order(
    columns: &Columns,
    order_by: &[IndexOrderBy],
) -> Result<(Vec<(usize, Direction)>, bool), InternalError> {
    if order_by.is_empty() {
        return Ok((Vec::new(), true));
    }

    let mut orders = Vec::with_capacity(order_by.len());
    for term in order_by {
        let column = columns.column(term.column).ok_or_else(|| {
            InternalError::planner_invalid(format!("order references unknown column #{}", term.column))
        })?;
        orders.push(column.field.order());
    }

    if orders.iter().all(|order| *order == Order::Any) {
        let delegated = order_by.iter().map(|t| (t.column, t.direction)).collect();
        return Ok((delegated, true));
    }

    let satisfied = orders
        .iter()
        .zip(order_by)
        .all(|(order, term)| order.satisfies(term.direction));

    Ok((Vec::new(), satisfied))
}

/// Pick the cheapest candidate; on equal cost prefer the one that pushes
/// more predicates down.
#[must_use]
pub fn choose_plan(candidates: impl IntoIterator<Item = IndexPlan>) -> Option<IndexPlan> {
    candidates.into_iter().reduce(|best, candidate| {
        match candidate.estimated_cost.total_cmp(&best.estimated_cost) {
            Ordering::Less => candidate,
            Ordering::Equal if candidate.pushed_filters() > best.pushed_filters() => candidate,
            _ => best,
        }
    })
}
