use crate::value::Value;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::cmp::Ordering;

/// Total comparator used for local sorting.
///
/// Ordering rules:
/// 1. Canonical rank (null < numeric < text < blob < boolean < temporal)
/// 2. Variant-specific comparison for same-ranked values
///
/// Integers, floats and decimals share one rank and compare numerically.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = canonical_rank(left).cmp(&canonical_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

/// Strict comparator for orderable values of compatible kinds.
///
/// Returns `None` when either side is null or the kinds do not compare.
#[must_use]
pub fn strict_order_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (
            Value::Integer(_) | Value::Float(_) | Value::Decimal(_),
            Value::Integer(_) | Value::Float(_) | Value::Decimal(_),
        ) => numeric_cmp(left, right),
        _ => None,
    }
}

/// SQL equality: unknown (`None`) when either side is null, `false` for
/// values of incompatible kinds.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> Option<bool> {
    if left.is_null() || right.is_null() {
        return None;
    }

    Some(strict_order_cmp(left, right) == Some(Ordering::Equal))
}

const fn canonical_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Integer(_) | Value::Float(_) | Value::Decimal(_) => 1,
        Value::Text(_) => 2,
        Value::Blob(_) => 3,
        Value::Boolean(_) => 4,
        Value::Date(_) => 5,
        Value::Time(_) => 6,
        Value::Timestamp(_) => 7,
        Value::Duration(_) => 8,
    }
}

fn canonical_cmp_same_rank(left: &Value, right: &Value) -> Ordering {
    if matches!(left, Value::Float(_)) || matches!(right, Value::Float(_)) {
        if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
            return a.total_cmp(&b);
        }
    }

    strict_order_cmp(left, right).unwrap_or(Ordering::Equal)
}

fn numeric_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
        (Value::Decimal(a), Value::Integer(b)) => Some(a.cmp(&Decimal::from(*b))),
        _ => as_f64(left)?.partial_cmp(&as_f64(right)?),
    }
}

#[expect(clippy::cast_precision_loss)]
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Decimal(v) => v.to_f64(),
        _ => None,
    }
}
