//! Module: generator
//! Responsibility: synthetic tables computed on the fly from a
//! `virtual://` identifier.
//! Does not own: storage; nothing is materialized and writes are refused.
//!
//! Two shapes are understood:
//!
//! - `virtual://series?start=1&stop=100&step=3` has one `value` INTEGER
//!   column; `stop` is inclusive and defaults to ten rows.
//! - `virtual://dates?start=2024-01-01&days=31` has one `day` DATE column.

use anytable_core::{
    adapter::{
        Adapter, AdapterArgs, AdapterConfig, AdapterFactory, ArgValue, Capabilities, CostModel, Row,
        RowStream, ScanRequest, Support, filter_data,
    },
    error::InternalError,
    field::{Columns, Field},
    filter::{Direction, Filter, FilterKind, Operator, Order},
    value::{Value, strict_order_cmp},
};
use chrono::{Days, NaiveDate};
use std::{cmp::Ordering, collections::BTreeMap};
use tracing::debug;
use url::Url;

pub const SCHEME: &str = "virtual";

const DEFAULT_ROWS: i64 = 10;
const DEFAULT_MAX_ROWS: u64 = 1_000_000;

///
/// Sequence
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Sequence {
    Series { start: i64, stop: i64, step: i64 },
    Dates { start: NaiveDate, days: u64 },
}

impl Sequence {
    const fn column(self) -> &'static str {
        match self {
            Self::Series { .. } => "value",
            Self::Dates { .. } => "day",
        }
    }

    const fn ascending(self) -> bool {
        match self {
            Self::Series { step, .. } => step > 0,
            Self::Dates { .. } => true,
        }
    }

    fn len(self) -> u64 {
        match self {
            Self::Series { start, stop, step } => {
                if (step > 0 && stop < start) || (step < 0 && stop > start) {
                    return 0;
                }
                let span = (i128::from(stop) - i128::from(start)).unsigned_abs();
                let step = i128::from(step).unsigned_abs();
                u64::try_from(span / step + 1).unwrap_or(u64::MAX)
            }
            Self::Dates { days, .. } => days,
        }
    }

    /// Internal values in generation order.
    fn values(self) -> Box<dyn Iterator<Item = Value>> {
        let len = self.len();

        match self {
            Self::Series { start, step, .. } => Box::new((0..len).map_while(move |i| {
                i64::try_from(i)
                    .ok()
                    .and_then(|i| i.checked_mul(step))
                    .and_then(|offset| start.checked_add(offset))
                    .map(Value::Integer)
            })),
            Self::Dates { start, .. } => Box::new((0..len).map_while(move |i| {
                start
                    .checked_add_days(Days::new(i))
                    .map(|day| Value::Text(day.to_string()))
            })),
        }
    }

    fn field(self) -> Field {
        let order = if self.ascending() {
            Order::Ascending
        } else {
            Order::Descending
        };

        let field = match self {
            Self::Series { .. } => Field::integer().with_filters([FilterKind::Range, FilterKind::Equal]),
            Self::Dates { .. } => Field::iso_date().with_filters([FilterKind::Range]),
        };

        field.with_order(order).with_exact(true)
    }

    fn to_args(self) -> AdapterArgs {
        match self {
            Self::Series { start, stop, step } => vec![
                ArgValue::from("series"),
                ArgValue::Integer(start),
                ArgValue::Integer(stop),
                ArgValue::Integer(step),
            ],
            Self::Dates { start, days } => vec![
                ArgValue::from("dates"),
                ArgValue::Text(start.to_string()),
                ArgValue::Integer(i64::try_from(days).unwrap_or(i64::MAX)),
            ],
        }
    }

    fn from_args(args: &[ArgValue]) -> Result<Self, InternalError> {
        let invalid = || InternalError::adapter_invalid(format!("generator: malformed arguments {args:?}"));

        match args {
            [ArgValue::Text(kind), ArgValue::Integer(start), ArgValue::Integer(stop), ArgValue::Integer(step)]
                if kind == "series" && *step != 0 =>
            {
                Ok(Self::Series {
                    start: *start,
                    stop: *stop,
                    step: *step,
                })
            }
            [ArgValue::Text(kind), ArgValue::Text(start), ArgValue::Integer(days)] if kind == "dates" => {
                Ok(Self::Dates {
                    start: parse_date(start)?,
                    days: u64::try_from(*days).map_err(|_| invalid())?,
                })
            }
            _ => Err(invalid()),
        }
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, InternalError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|err| InternalError::adapter_invalid(format!("generator: bad date '{text}': {err}")))
}

fn parse_url(identifier: &str) -> Option<Url> {
    Url::parse(identifier).ok().filter(|url| url.scheme() == SCHEME)
}

fn parse_sequence(identifier: &str) -> Result<Sequence, InternalError> {
    let url = parse_url(identifier).ok_or_else(|| {
        InternalError::adapter_invalid(format!("not a virtual table identifier: {identifier}"))
    })?;
    let params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();

    let integer = |key: &str, default: i64| -> Result<i64, InternalError> {
        params.get(key).map_or(Ok(default), |raw| {
            raw.parse().map_err(|_| {
                InternalError::adapter_invalid(format!("generator: `{key}` must be an integer, got '{raw}'"))
            })
        })
    };

    match url.host_str() {
        Some("series") => {
            let start = integer("start", 0)?;
            let step = integer("step", 1)?;
            if step == 0 {
                return Err(InternalError::adapter_invalid("generator: `step` must not be zero"));
            }
            let default_stop = start.saturating_add(step.saturating_mul(DEFAULT_ROWS - 1));
            let stop = integer("stop", default_stop)?;

            Ok(Sequence::Series { start, stop, step })
        }
        Some("dates") => {
            let start = params
                .get("start")
                .ok_or_else(|| InternalError::adapter_invalid("generator: dates need a `start` date"))?;
            let days = integer("days", DEFAULT_ROWS)?;

            Ok(Sequence::Dates {
                start: parse_date(start)?,
                days: u64::try_from(days)
                    .map_err(|_| InternalError::adapter_invalid("generator: `days` must not be negative"))?,
            })
        }
        other => Err(InternalError::adapter_invalid(format!(
            "generator: unknown sequence {other:?}"
        ))),
    }
}

/// Whether a monotonic sequence has moved past everything `filter` admits.
fn beyond(filter: Option<&Filter>, value: &Value, ascending: bool) -> bool {
    let edge = match filter {
        Some(Filter::Equal(expected)) => Some((expected, true)),
        Some(Filter::Range(range)) if ascending => range.end.as_ref().map(|end| (end, range.include_end)),
        Some(Filter::Range(range)) => range.start.as_ref().map(|start| (start, range.include_start)),
        _ => None,
    };
    let Some((edge, inclusive)) = edge else {
        return false;
    };
    let past = if ascending {
        Ordering::Greater
    } else {
        Ordering::Less
    };

    match strict_order_cmp(value, edge) {
        Some(Ordering::Equal) => !inclusive,
        Some(ord) => ord == past,
        None => false,
    }
}

///
/// GeneratorAdapter
///

pub struct GeneratorAdapter {
    sequence: Sequence,
    columns: Columns,
    cost: CostModel,
}

impl GeneratorAdapter {
    // A scan walks the sequence once whatever is pushed down.
    #[expect(clippy::cast_precision_loss)]
    fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            columns: Columns::new().with(sequence.column(), sequence.field()),
            cost: CostModel::Fixed(sequence.len() as f64),
        }
    }
}

impl Adapter for GeneratorAdapter {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_limit_offset()
    }

    fn metadata(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([(
            "rows".to_string(),
            Value::Integer(i64::try_from(self.sequence.len()).unwrap_or(i64::MAX)),
        )])
    }

    fn estimate_cost(&self, filtered: &[(String, Operator)], order: &[(String, Direction)]) -> f64 {
        self.cost.estimate(filtered.len(), order.len())
    }

    fn get_data(&mut self, request: &ScanRequest) -> Result<RowStream<'_>, InternalError> {
        let column = self.sequence.column();
        let ascending = self.sequence.ascending();
        let bound = request.bounds.get(column).cloned();

        let rows = self
            .sequence
            .values()
            .take_while(move |value| !beyond(bound.as_ref(), value, ascending))
            .zip(0..)
            .map(move |(value, rowid)| Ok(Row::new().with_rowid(rowid).with(column, value)));

        Ok(filter_data(rows, request))
    }
}

///
/// GeneratorFactory
///
/// Answers from the identifier alone, so both probe passes agree. The
/// `max_rows` configuration key caps how large a sequence may be.
///

#[derive(Debug, Default)]
pub struct GeneratorFactory;

impl AdapterFactory for GeneratorFactory {
    fn name(&self) -> &str {
        "generator"
    }

    fn is_safe(&self) -> bool {
        true
    }

    fn supports(&self, identifier: &str, _fast: bool, _config: &AdapterConfig) -> Support {
        match parse_url(identifier).as_ref().and_then(Url::host_str) {
            Some("series" | "dates") => Support::Yes,
            _ => Support::No,
        }
    }

    fn parse_identifier(&self, identifier: &str) -> Result<AdapterArgs, InternalError> {
        parse_sequence(identifier).map(Sequence::to_args)
    }

    fn create(&self, args: &AdapterArgs, config: &AdapterConfig) -> Result<Box<dyn Adapter>, InternalError> {
        let sequence = Sequence::from_args(args)?;
        let max_rows = match config.get("max_rows") {
            None => DEFAULT_MAX_ROWS,
            Some(value) => value
                .as_i64()
                .and_then(|v| u64::try_from(v).ok())
                .ok_or_else(|| InternalError::adapter_invalid("generator: `max_rows` must be a non-negative integer"))?,
        };

        if sequence.len() > max_rows {
            return Err(InternalError::adapter_invalid(format!(
                "generator: {} rows exceed max_rows = {max_rows}",
                sequence.len()
            )));
        }
        debug!(sequence = ?sequence, rows = sequence.len(), "generating virtual table");

        Ok(Box::new(GeneratorAdapter::new(sequence)))
    }
}

///
/// TESTS
///
