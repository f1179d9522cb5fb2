use anytable_core::value::Value;
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeMap;

/// One JSON scalar as a cell. Nested arrays and objects are kept as their
/// JSON text.
pub(super) fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Boolean(v),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(text) => Value::Text(text),
        nested @ (Json::Array(_) | Json::Object(_)) => Value::Text(nested.to_string()),
    }
}

#[expect(clippy::cast_precision_loss)]
pub(super) const fn widen(v: i64) -> f64 {
    v as f64
}

pub(super) fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(v) => Json::Bool(*v),
        Value::Integer(v) => Json::from(*v),
        Value::Float(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Text(text) => Json::String(text.clone()),
        other => Json::String(other.to_string()),
    }
}

pub(super) fn record_to_json(record: &BTreeMap<String, Value>) -> Json {
    Json::Object(
        record
            .iter()
            .map(|(column, value)| (column.clone(), to_json(value)))
            .collect::<Map<_, _>>(),
    )
}
