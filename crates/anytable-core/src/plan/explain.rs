//! Deterministic, read-only description of a chosen plan.

use crate::{
    field::Columns,
    filter::{Direction, Operator},
    plan::{ConstraintOp, IndexConstraint, IndexPlan},
};
use std::fmt;

///
/// ExplainPlan
///
/// What was delegated to the adapter and what the engine completes.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ExplainPlan {
    pub table: String,
    pub pushed: Vec<ExplainPredicate>,
    pub residual: Vec<ExplainPredicate>,
    pub delegated_order: Vec<(String, Direction)>,
    pub sort_required: bool,
    pub limit: ExplainSlice,
    pub offset: ExplainSlice,
    pub requested_columns: Option<Vec<String>>,
    pub estimated_cost: f64,
}

///
/// ExplainPredicate
///
/// `rechecked` marks a delegated predicate the engine evaluates again
/// because the adapter filters inexactly.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainPredicate {
    pub column: String,
    pub op: Operator,
    pub rechecked: bool,
}

///
/// ExplainSlice
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExplainSlice {
    Absent,
    Delegated,
    Local,
}

impl ExplainPlan {
    #[must_use]
    pub fn new(table: &str, columns: &Columns, constraints: &[IndexConstraint], plan: &IndexPlan) -> Self {
        let mut pushed = Vec::new();
        let mut residual = Vec::new();
        let mut limit = ExplainSlice::Absent;
        let mut offset = ExplainSlice::Absent;

        for (constraint, usage) in constraints.iter().zip(&plan.usage) {
            match constraint.op {
                ConstraintOp::Compare(op) => {
                    let column = constraint
                        .column
                        .and_then(|i| columns.column(i))
                        .map_or_else(String::new, |c| c.name.clone());
                    match usage {
                        Some(usage) => pushed.push(ExplainPredicate {
                            column,
                            op,
                            rechecked: !usage.omit,
                        }),
                        None => residual.push(ExplainPredicate {
                            column,
                            op,
                            rechecked: true,
                        }),
                    }
                }
                ConstraintOp::Limit => {
                    limit = if plan.limit_delegated() {
                        ExplainSlice::Delegated
                    } else {
                        ExplainSlice::Local
                    };
                }
                ConstraintOp::Offset => {
                    offset = if plan.offset_delegated() {
                        ExplainSlice::Delegated
                    } else {
                        ExplainSlice::Local
                    };
                }
            }
        }

        let delegated_order = plan
            .index
            .order
            .iter()
            .filter_map(|(i, direction)| columns.column(*i).map(|c| (c.name.clone(), *direction)))
            .collect();

        Self {
            table: table.to_string(),
            pushed,
            residual,
            delegated_order,
            sort_required: !plan.order_consumed,
            limit,
            offset,
            requested_columns: plan.index.requested_columns.clone(),
            estimated_cost: plan.estimated_cost,
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |preds: &[ExplainPredicate]| {
            preds
                .iter()
                .map(|p| {
                    let mark = if p.rechecked { "*" } else { "" };
                    format!("{} {}{mark}", p.column, p.op)
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        writeln!(f, "SCAN {} (cost {})", self.table, self.estimated_cost)?;
        writeln!(f, "  pushed: [{}]", render(&self.pushed))?;
        writeln!(f, "  residual: [{}]", render(&self.residual))?;
        let order: Vec<String> = self
            .delegated_order
            .iter()
            .map(|(column, direction)| format!("{column} {direction}"))
            .collect();
        writeln!(f, "  order: [{}] sort_required={}", order.join(", "), self.sort_required)?;
        write!(f, "  limit: {:?} offset: {:?}", self.limit, self.offset)
    }
}
