use crate::{
    field::{ConversionFailure, FieldKind},
    value::Value,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::{fmt, str::FromStr, sync::Arc};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

///
/// CustomCodec
///
/// Extension point for storage formats the builtin codecs do not cover.
///

pub trait CustomCodec: fmt::Debug + Send + Sync {
    fn parse(&self, internal: Value) -> Result<Value, ConversionFailure>;

    fn format(&self, external: Value) -> Result<Value, ConversionFailure>;

    fn quote(&self, internal: &Value) -> String {
        quote_literal(internal)
    }
}

///
/// Codec
///
/// How a column's values are stored by the adapter.
///

#[derive(Clone, Debug)]
pub enum Codec {
    Custom(Arc<dyn CustomCodec>),
    IntBoolean,
    IsoDate,
    IsoDateTime,
    IsoTime,
    Native,
    StringBlob,
    StringBoolean,
    StringDecimal,
    StringDuration,
    StringInteger,
}

impl Codec {
    pub(crate) fn parse(&self, kind: FieldKind, internal: Value) -> Result<Value, ConversionFailure> {
        match (self, internal) {
            (Self::Custom(codec), value) => codec.parse(value),
            (Self::Native, value) => native(kind, value),

            (Self::IntBoolean, Value::Integer(v)) => Ok(Value::Boolean(v != 0)),
            (Self::IntBoolean, Value::Boolean(v)) => Ok(Value::Boolean(v)),
            (Self::StringBoolean, Value::Text(text)) => parse_bool(&text)
                .map(Value::Boolean)
                .ok_or_else(|| ConversionFailure::new(&Value::Text(text), "boolean text")),
            (Self::StringInteger, Value::Text(text)) => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ConversionFailure::new(&Value::Text(text), "integer text")),
            (Self::StringDecimal, Value::Text(text)) => Decimal::from_str(text.trim())
                .map(Value::Decimal)
                .map_err(|_| ConversionFailure::new(&Value::Text(text), "decimal text")),
            (Self::IsoDate, Value::Text(text)) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| ConversionFailure::new(&Value::Text(text), "ISO date")),
            (Self::IsoTime, Value::Text(text)) => parse_time(&text)
                .map(Value::Time)
                .ok_or_else(|| ConversionFailure::new(&Value::Text(text), "ISO time")),
            (Self::IsoDateTime, Value::Text(text)) => parse_timestamp(&text)
                .map(Value::Timestamp)
                .ok_or_else(|| ConversionFailure::new(&Value::Text(text), "ISO timestamp")),
            (Self::StringDuration, Value::Text(text)) => parse_duration(&text)
                .map(Value::Duration)
                .ok_or_else(|| ConversionFailure::new(&Value::Text(text), "duration text")),
            (Self::StringBlob, Value::Text(text)) => hex::decode(text.trim())
                .map(Value::Blob)
                .map_err(|_| ConversionFailure::new(&Value::Text(text), "hex text")),

            (codec, other) => Err(ConversionFailure::new(&other, codec.internal_label())),
        }
    }

    pub(crate) fn format(&self, kind: FieldKind, external: Value) -> Result<Value, ConversionFailure> {
        match (self, external) {
            (Self::Custom(codec), value) => codec.format(value),
            (Self::Native, value) => native(kind, value),

            (Self::IntBoolean, Value::Boolean(v)) => Ok(Value::Integer(i64::from(v))),
            (Self::StringBoolean, Value::Boolean(v)) => {
                Ok(Value::Text(if v { "TRUE" } else { "FALSE" }.to_string()))
            }
            (Self::StringInteger, Value::Integer(v)) => Ok(Value::Text(v.to_string())),
            (Self::StringDecimal, Value::Decimal(v)) => Ok(Value::Text(v.to_string())),
            (Self::StringDecimal, Value::Integer(v)) => Ok(Value::Text(Decimal::from(v).to_string())),
            (Self::IsoDate, Value::Date(v)) => Ok(Value::Text(v.format("%Y-%m-%d").to_string())),
            (Self::IsoTime, Value::Time(v)) => Ok(Value::Text(v.format("%H:%M:%S%.f").to_string())),
            (Self::IsoDateTime, Value::Timestamp(v)) => {
                Ok(Value::Text(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            }
            (Self::StringDuration, Value::Duration(v)) => format_duration(v)
                .map(Value::Text)
                .ok_or_else(|| ConversionFailure::new(&Value::Duration(v), "duration in whole microseconds")),
            (Self::StringBlob, Value::Blob(v)) => Ok(Value::Text(hex::encode(v))),

            (_, other) => Err(ConversionFailure::new(&other, kind.type_name())),
        }
    }

    pub(crate) fn quote(&self, internal: &Value) -> String {
        match (self, internal) {
            (Self::Custom(codec), value) => codec.quote(value),
            (Self::StringInteger | Self::StringDecimal, Value::Text(text)) => text.clone(),
            (_, value) => quote_literal(value),
        }
    }

    const fn internal_label(&self) -> &'static str {
        match self {
            Self::Custom(_) | Self::Native => "native value",
            Self::IntBoolean => "integer",
            Self::IsoDate
            | Self::IsoDateTime
            | Self::IsoTime
            | Self::StringBlob
            | Self::StringBoolean
            | Self::StringDecimal
            | Self::StringDuration
            | Self::StringInteger => "text",
        }
    }
}

// Native storage: the value must already be of the column's kind.
// Integers widen into float columns.
#[expect(clippy::cast_precision_loss)]
fn native(kind: FieldKind, value: Value) -> Result<Value, ConversionFailure> {
    match (kind, value) {
        (FieldKind::Float, Value::Integer(v)) => Ok(Value::Float(v as f64)),
        (kind, value) if kind.matches(&value) => Ok(value),
        (kind, value) => Err(ConversionFailure::new(&value, kind.type_name())),
    }
}

/// Render an internal value as a query literal.
#[must_use]
pub(crate) fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(text) => format!("'{}'", text.replace('\'', "''")),
        Value::Integer(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::Boolean(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        Value::Blob(bytes) => format!("X'{}'", hex::encode(bytes)),
        Value::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
        Value::Time(v) => format!("'{}'", v.format("%H:%M:%S%.f")),
        Value::Timestamp(v) => format!("'{}'", v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Duration(v) => format!("'{}'", format_duration(*v).unwrap_or_else(|| v.to_string())),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

// RFC 3339 with offset; naive timestamps are taken as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `[N day[s], ]H:MM:SS[.ffffff]`
/// `None` when the duration overflows microseconds or has a fraction
/// finer than one microsecond.
fn format_duration(delta: TimeDelta) -> Option<String> {
    if delta.subsec_nanos() % 1_000 != 0 {
        return None;
    }
    let micros = delta.num_microseconds()?;
    let days = micros.div_euclid(MICROS_PER_DAY);
    let rem = micros.rem_euclid(MICROS_PER_DAY);

    let hours = rem / (3_600 * MICROS_PER_SECOND);
    let minutes = rem / (60 * MICROS_PER_SECOND) % 60;
    let seconds = rem / MICROS_PER_SECOND % 60;
    let fraction = rem % MICROS_PER_SECOND;

    let mut out = String::new();
    if days != 0 {
        let plural = if days.abs() == 1 { "" } else { "s" };
        out.push_str(&format!("{days} day{plural}, "));
    }
    out.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if fraction != 0 {
        out.push_str(&format!(".{fraction:06}"));
    }

    Some(out)
}

fn parse_duration(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    let (days, clock) = match text.split_once(", ") {
        Some((days, clock)) => {
            let days = days
                .strip_suffix(" days")
                .or_else(|| days.strip_suffix(" day"))?
                .trim()
                .parse::<i64>()
                .ok()?;
            (days, clock)
        }
        None => (0, text),
    };

    let mut parts = clock.split(':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = parts.next()?.parse::<i64>().ok()?;
    let seconds = parts.next()?;
    if parts.next().is_some() || !(0..60).contains(&minutes) || hours < 0 {
        return None;
    }

    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (seconds, ""),
    };
    let whole = whole.parse::<i64>().ok()?;
    if !(0..60).contains(&whole) || fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let fraction = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<6}").parse::<i64>().ok()?
    };

    let micros = days
        .checked_mul(MICROS_PER_DAY)?
        .checked_add(hours.checked_mul(3_600 * MICROS_PER_SECOND)?)?
        .checked_add(minutes * 60 * MICROS_PER_SECOND)?
        .checked_add(whole * MICROS_PER_SECOND)?
        .checked_add(fraction)?;

    Some(TimeDelta::microseconds(micros))
}
