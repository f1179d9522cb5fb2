use crate::{
    adapter::ScanRequest,
    error::InternalError,
    field::Columns,
    filter::{Bounds, Operator},
    plan::{IndexSpec, PlannedArg},
    value::Value,
};
use std::collections::BTreeMap;

/// Rebuild the adapter request from a planned index and the engine's
/// argument values.
///
/// Filter values arrive in engine form and are converted with the
/// column's field before filters are built. Each column gets exactly one
/// filter, of the first declared family that accepts all its operators.
pub fn build_scan_request(columns: &Columns, spec: &IndexSpec, args: &[Value]) -> Result<ScanRequest, InternalError> {
    if spec.args.len() != args.len() {
        return Err(InternalError::planner_invalid(format!(
            "index expects {} arguments, got {}",
            spec.args.len(),
            args.len()
        )));
    }

    let mut operations: BTreeMap<usize, Vec<(Operator, Value)>> = BTreeMap::new();
    let mut limit = None;
    let mut offset = None;
    let mut widen_limit = None;

    for (planned, value) in spec.args.iter().zip(args) {
        match *planned {
            PlannedArg::Filter { column, op } => {
                let name = column_name(columns, column)?;
                let internal = if op.takes_value() {
                    columns.format_value(name, value.clone())?
                } else {
                    Value::Null
                };
                operations.entry(column).or_default().push((op, internal));
            }
            PlannedArg::Limit => limit = slice_value(value, "LIMIT")?,
            PlannedArg::Offset => offset = slice_value(value, "OFFSET")?,
            PlannedArg::OffsetForLimit => widen_limit = slice_value(value, "OFFSET")?,
        }
    }

    let mut bounds = Bounds::new();
    for (column, ops) in operations {
        let name = column_name(columns, column)?;
        let field = &columns
            .column(column)
            .ok_or_else(|| InternalError::planner_invariant(format!("unknown column #{column}")))?
            .field;
        let kind = field
            .filters()
            .iter()
            .find(|kind| ops.iter().all(|(op, _)| kind.accepts(*op)))
            .ok_or_else(|| {
                InternalError::planner_invariant(format!(
                    "no single filter family on '{name}' covers the planned operators"
                ))
            })?;
        bounds.insert(name.to_string(), kind.build(&ops)?);
    }

    if let (Some(limit), Some(extra)) = (limit.as_mut(), widen_limit) {
        *limit = u64::saturating_add(*limit, extra);
    }

    let order = spec
        .order
        .iter()
        .map(|(column, direction)| Ok((column_name(columns, *column)?.to_string(), *direction)))
        .collect::<Result<Vec<_>, InternalError>>()?;

    Ok(ScanRequest {
        bounds,
        order,
        limit,
        offset,
        requested_columns: spec
            .requested_columns
            .as_ref()
            .map(|names| names.iter().cloned().collect()),
    })
}

fn column_name(columns: &Columns, column: usize) -> Result<&str, InternalError> {
    columns
        .column(column)
        .map(|c| c.name.as_str())
        .ok_or_else(|| InternalError::planner_invalid(format!("unknown column #{column}")))
}

// Negative LIMIT means "no limit"; negative OFFSET means none.
fn slice_value(value: &Value, clause: &str) -> Result<Option<u64>, InternalError> {
    match value {
        Value::Integer(v) => Ok(u64::try_from(*v).ok()),
        Value::Null => Ok(None),
        other => Err(InternalError::planner_invalid(format!(
            "{clause} must be an integer, got {}",
            other.describe()
        ))),
    }
}
