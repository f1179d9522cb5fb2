//! Module: value
//! Responsibility: the dynamic value shared by adapters and the engine.
//! Does not own: conversion between adapter and engine forms (see `field`).

mod compare;


pub use compare::{canonical_cmp, strict_order_cmp, values_equal};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::fmt;

///
/// Value
///
/// One cell. The same enum carries adapter-internal values (for example
/// an ISO date stored as `Text`) and engine-facing values (`Date`).
///

#[remain::sorted]
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Blob(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Decimal(Decimal),
    Duration(TimeDelta),
    Float(f64),
    Integer(i64),
    Null,
    Text(String),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Stable label of the variant, used in conversion errors.
    #[must_use]
    pub const fn variant_label(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Decimal(_) => "decimal",
            Self::Duration(_) => "duration",
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Render the value for diagnostics, quoting text so that empty and
    /// whitespace strings stay visible.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("'{text}'"),
            other => format!("{other} ({})", other.variant_label()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(bytes) => write!(f, "x'{}'", hex::encode(bytes)),
            Self::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Self::Date(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Duration(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Null => write!(f, "NULL"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i32 => Integer,
    i64 => Integer,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Blob,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime<Utc> => Timestamp,
    TimeDelta => Duration,
    Decimal => Decimal,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
