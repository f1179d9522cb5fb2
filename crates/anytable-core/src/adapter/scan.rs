use crate::{
    adapter::{Row, RowStream, ScanRequest},
    error::InternalError,
    field::FieldKind,
    filter::{Direction, Order},
    value::{Value, canonical_cmp, strict_order_cmp},
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

/// Apply a scan request to a stream of internal rows.
///
/// Adapters with no native query capability can hand their full row set
/// to this and declare every filter exact. Rows are filtered lazily; a
/// requested order forces the stream to be buffered for sorting.
pub fn filter_data<'a, I>(rows: I, request: &ScanRequest) -> RowStream<'a>
where
    I: Iterator<Item = Result<Row, InternalError>> + 'a,
{
    if request.bounds.values().any(|filter| filter.is_impossible()) {
        return Box::new(std::iter::empty());
    }

    let bounds = request.bounds.clone();
    let matching = rows.filter(move |row| match row {
        Ok(row) => bounds
            .iter()
            .all(|(column, filter)| filter.check(row.get(column))),
        Err(_) => true,
    });

    let ordered: RowStream<'a> = if request.order.is_empty() {
        Box::new(matching)
    } else {
        match matching.collect::<Result<Vec<_>, _>>() {
            Ok(mut rows) => {
                sort_rows(&mut rows, &request.order);
                Box::new(rows.into_iter().map(Ok))
            }
            Err(err) => Box::new(std::iter::once(Err(err))),
        }
    };

    let offset = request
        .offset
        .map_or(0, |v| usize::try_from(v).unwrap_or(usize::MAX));
    let limit = request
        .limit
        .map_or(usize::MAX, |v| usize::try_from(v).unwrap_or(usize::MAX));
    let requested = request.requested_columns.clone();

    Box::new(ordered.skip(offset).take(limit).map(move |row| {
        let mut row = row?;
        if let Some(requested) = &requested {
            row.values.retain(|column, _| requested.contains(column));
        }
        Ok(row)
    }))
}

/// Stable lexicographic sort; nulls sort first ascending, last descending.
pub(crate) fn sort_rows(rows: &mut [Row], order: &[(String, Direction)]) {
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|(column, direction)| {
                let ord = canonical_cmp(a.get(column), b.get(column));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

///
/// Analysis
///
/// What a single pass over a row set reveals about it.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    pub num_rows: usize,
    pub order: BTreeMap<String, Order>,
    pub kinds: BTreeMap<String, FieldKind>,
}

/// Infer row count, per-column order and per-column kind from the rows.
///
/// Kinds widen as values disagree (integer to float to text); a column
/// that only ever held nulls is reported as text.
pub fn analyze<I>(rows: I) -> Analysis
where
    I: IntoIterator<Item = BTreeMap<String, Value>>,
{
    let mut analysis = Analysis::default();
    let mut previous: BTreeMap<String, Value> = BTreeMap::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for row in rows {
        analysis.num_rows += 1;

        for (column, value) in row {
            seen.insert(column.clone());

            let kind = analysis.kinds.get(&column).copied();
            if let Some(widened) = widen(kind, &value) {
                analysis.kinds.insert(column.clone(), widened);
            }

            let current = analysis.order.get(&column).copied().unwrap_or(Order::None);
            let next = previous.get(&column).map_or(Order::None, |prev| {
                update_order(current, prev, &value, analysis.num_rows)
            });
            analysis.order.insert(column.clone(), next);
            previous.insert(column, value);
        }
    }

    for column in seen {
        analysis.kinds.entry(column).or_insert(FieldKind::Text);
    }

    analysis
}

fn widen(current: Option<FieldKind>, value: &Value) -> Option<FieldKind> {
    let observed = match value {
        Value::Null => return None,
        Value::Integer(_) => FieldKind::Integer,
        Value::Float(_) => FieldKind::Float,
        Value::Boolean(_) => FieldKind::Boolean,
        _ => FieldKind::Text,
    };

    Some(match (current, observed) {
        (None, observed) => observed,
        (Some(current), observed) if current == observed => current,
        (Some(FieldKind::Integer | FieldKind::Float), FieldKind::Integer | FieldKind::Float) => {
            FieldKind::Float
        }
        _ => FieldKind::Text,
    })
}

/// Refine a column's order guarantee with one more value.
///
/// Two rows establish a direction; any later step against it, a null, or
/// an incomparable value drops the guarantee.
#[must_use]
pub fn update_order(current: Order, previous: &Value, value: &Value, num_rows: usize) -> Order {
    if num_rows < 2 || previous.is_null() || value.is_null() {
        return Order::None;
    }

    let Some(step) = strict_order_cmp(value, previous) else {
        return Order::None;
    };

    if num_rows == 2 {
        return match step {
            Ordering::Less => Order::Descending,
            Ordering::Equal | Ordering::Greater => Order::Ascending,
        };
    }

    match (current, step) {
        (Order::Ascending, Ordering::Less) | (Order::Descending, Ordering::Greater) => Order::None,
        (current, _) => current,
    }
}
