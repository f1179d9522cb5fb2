//! Module: field
//! Responsibility: column descriptors and the internal/external value bridge.
//! Does not own: predicate evaluation (see `filter`).
//!
//! "Internal" values are what an adapter stores and returns; "external"
//! values are what the engine sees. Every column owns a `Field` that
//! converts both ways and renders internal values as query literals.

mod codec;

#[cfg(test)]
mod tests;

pub use codec::{Codec, CustomCodec};

use crate::{
    error::TypeConversionError,
    filter::{FilterKind, Order},
    value::Value,
};
use std::fmt;

///
/// FieldKind
///
/// Semantic type of a column as the engine sees it.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldKind {
    Blob,
    Boolean,
    Date,
    Decimal,
    Duration,
    Float,
    Integer,
    Text,
    Time,
    Timestamp,
}

impl FieldKind {
    /// Column type used in table-creation statements.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Blob => "BLOB",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Decimal => "DECIMAL",
            Self::Duration => "DURATION",
            Self::Float => "REAL",
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Inverse of `type_name`, ignoring case.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        [
            Self::Blob,
            Self::Boolean,
            Self::Date,
            Self::Decimal,
            Self::Duration,
            Self::Float,
            Self::Integer,
            Self::Text,
            Self::Time,
            Self::Timestamp,
        ]
        .into_iter()
        .find(|kind| kind.type_name().eq_ignore_ascii_case(name))
    }

    /// Whether an engine-facing value belongs to this kind.
    #[must_use]
    pub const fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Self::Blob, Value::Blob(_))
                | (Self::Boolean, Value::Boolean(_))
                | (Self::Date, Value::Date(_))
                | (Self::Decimal, Value::Decimal(_))
                | (Self::Duration, Value::Duration(_))
                | (Self::Float, Value::Float(_))
                | (Self::Integer, Value::Integer(_))
                | (Self::Text, Value::Text(_))
                | (Self::Time, Value::Time(_))
                | (Self::Timestamp, Value::Timestamp(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

///
/// ConversionFailure
///
/// A conversion failed before the owning column was known.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConversionFailure {
    pub value: String,
    pub expected: String,
}

impl ConversionFailure {
    pub(crate) fn new(value: &Value, expected: impl Into<String>) -> Self {
        Self {
            value: value.describe(),
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn for_column(self, column: &str) -> TypeConversionError {
        TypeConversionError {
            column: column.to_string(),
            value: self.value,
            expected: self.expected,
        }
    }
}

///
/// Field
///
/// Semantic kind, storage codec, the filter families the adapter evaluates
/// itself, whether that evaluation is exact, and the order guarantee.
/// Families are tried in declaration order when several could apply.
///

#[derive(Clone, Debug)]
pub struct Field {
    kind: FieldKind,
    codec: Codec,
    filters: Vec<FilterKind>,
    order: Order,
    exact: bool,
}

impl Field {
    #[must_use]
    pub const fn new(kind: FieldKind, codec: Codec) -> Self {
        Self {
            kind,
            codec,
            filters: Vec::new(),
            order: Order::None,
            exact: false,
        }
    }

    #[must_use]
    pub const fn native(kind: FieldKind) -> Self {
        Self::new(kind, Codec::Native)
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::native(FieldKind::Integer)
    }

    #[must_use]
    pub const fn float() -> Self {
        Self::native(FieldKind::Float)
    }

    #[must_use]
    pub const fn text() -> Self {
        Self::native(FieldKind::Text)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::native(FieldKind::Boolean)
    }

    #[must_use]
    pub const fn blob() -> Self {
        Self::native(FieldKind::Blob)
    }

    #[must_use]
    pub const fn date() -> Self {
        Self::native(FieldKind::Date)
    }

    #[must_use]
    pub const fn time() -> Self {
        Self::native(FieldKind::Time)
    }

    #[must_use]
    pub const fn timestamp() -> Self {
        Self::native(FieldKind::Timestamp)
    }

    #[must_use]
    pub const fn duration() -> Self {
        Self::native(FieldKind::Duration)
    }

    #[must_use]
    pub const fn decimal() -> Self {
        Self::native(FieldKind::Decimal)
    }

    /// Boolean stored as an integer (0 / non-zero).
    #[must_use]
    pub const fn int_boolean() -> Self {
        Self::new(FieldKind::Boolean, Codec::IntBoolean)
    }

    /// Boolean stored as text (`true`, `yes`, `on`, `1`, ...).
    #[must_use]
    pub const fn string_boolean() -> Self {
        Self::new(FieldKind::Boolean, Codec::StringBoolean)
    }

    #[must_use]
    pub const fn string_integer() -> Self {
        Self::new(FieldKind::Integer, Codec::StringInteger)
    }

    #[must_use]
    pub const fn string_decimal() -> Self {
        Self::new(FieldKind::Decimal, Codec::StringDecimal)
    }

    #[must_use]
    pub const fn iso_date() -> Self {
        Self::new(FieldKind::Date, Codec::IsoDate)
    }

    #[must_use]
    pub const fn iso_time() -> Self {
        Self::new(FieldKind::Time, Codec::IsoTime)
    }

    #[must_use]
    pub const fn iso_timestamp() -> Self {
        Self::new(FieldKind::Timestamp, Codec::IsoDateTime)
    }

    #[must_use]
    pub const fn string_duration() -> Self {
        Self::new(FieldKind::Duration, Codec::StringDuration)
    }

    #[must_use]
    pub const fn string_blob() -> Self {
        Self::new(FieldKind::Blob, Codec::StringBlob)
    }

    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = FilterKind>) -> Self {
        self.filters = filters.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterKind] {
        &self.filters
    }

    #[must_use]
    pub const fn order(&self) -> Order {
        self.order
    }

    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.exact
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Internal (adapter) value to external (engine) value.
    pub fn parse(&self, internal: Value) -> Result<Value, ConversionFailure> {
        if internal.is_null() {
            return Ok(Value::Null);
        }

        self.codec.parse(self.kind, internal)
    }

    /// External (engine) value to internal (adapter) value.
    pub fn format(&self, external: Value) -> Result<Value, ConversionFailure> {
        if external.is_null() {
            return Ok(Value::Null);
        }

        self.codec.format(self.kind, external)
    }

    /// Render an internal value as a literal for adapter-side queries.
    #[must_use]
    pub fn quote(&self, internal: &Value) -> String {
        self.codec.quote(internal)
    }
}

///
/// Column
///

#[derive(Clone, Debug)]
pub struct Column {
    pub name: String,
    pub field: Field,
}

///
/// Columns
///
/// Ordered column list declared by an adapter instance.
///

#[derive(Clone, Debug, Default)]
pub struct Columns {
    entries: Vec<Column>,
}

impl Columns {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, field: Field) -> Self {
        self.push(name, field);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, field: Field) {
        self.entries.push(Column {
            name: name.into(),
            field,
        });
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.entries.iter().find(|c| c.name == name).map(|c| &c.field)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert one internal value of the named column.
    pub fn parse_value(&self, name: &str, internal: Value) -> Result<Value, TypeConversionError> {
        match self.get(name) {
            Some(field) => field.parse(internal).map_err(|f| f.for_column(name)),
            None => Ok(internal),
        }
    }

    /// Convert one external value of the named column.
    pub fn format_value(&self, name: &str, external: Value) -> Result<Value, TypeConversionError> {
        match self.get(name) {
            Some(field) => field.format(external).map_err(|f| f.for_column(name)),
            None => Ok(external),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Field)> for Columns {
    fn from_iter<T: IntoIterator<Item = (S, Field)>>(iter: T) -> Self {
        let mut columns = Self::new();
        for (name, field) in iter {
            columns.push(name, field);
        }
        columns
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
