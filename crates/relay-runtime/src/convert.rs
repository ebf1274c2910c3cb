//! Conversion between wire JSON and script values.

use indexmap::IndexMap;
use relay_engine::vm::value::{format_float, ValueWalk};
use relay_engine::Value;
use serde_json::{Map, Number, Value as Json};

/// Marker written in place of a container the conversion refuses to expand.
pub const TRUNCATED: &str = "...";

/// Convert a request argument into a script value.
///
/// Integers that fit in `i64` stay integers; every other number becomes a
/// float.
pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::str(s.as_str()),
        Json::Array(items) => Value::list(items.iter().map(from_json).collect()),
        Json::Object(entries) => Value::dict(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect::<IndexMap<_, _>>(),
        ),
    }
}

/// Convert a result value for the wire.
///
/// Lists, dicts and instances reached again while inside themselves become
/// [`TRUNCATED`], so cyclic object graphs convert in linear time.
pub fn to_json(value: &Value) -> Json {
    to_json_at(value, &mut ValueWalk::new())
}

fn to_json_at(value: &Value, walk: &mut ValueWalk) -> Json {
    if !walk.enter(value) {
        return Json::String(TRUNCATED.to_string());
    }
    let json = convert(value, walk);
    if value.identity().is_some() {
        walk.leave();
    }
    json
}

fn convert(value: &Value, walk: &mut ValueWalk) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::Number((*n).into()),
        Value::Float(n) => match Number::from_f64(*n) {
            Some(number) => Json::Number(number),
            None => Json::String(format_float(*n)),
        },
        Value::Str(s) => Json::String(s.to_string()),
        Value::List(items) => {
            let items = items.read().clone();
            Json::Array(items.iter().map(|v| to_json_at(v, walk)).collect())
        }
        Value::Dict(entries) => {
            let entries = entries.read().clone();
            object(entries.iter().map(|(k, v)| (k.clone(), v.clone())), walk)
        }
        Value::Instance(instance) => object(instance.field_entries(), walk),
        Value::Function(_)
        | Value::Builtin(_)
        | Value::Class(_)
        | Value::BoundMethod(_)
        | Value::Module(_) => Json::String(value.to_string()),
    }
}

fn object(entries: impl IntoIterator<Item = (String, Value)>, walk: &mut ValueWalk) -> Json {
    let map: Map<String, Json> = entries
        .into_iter()
        .map(|(k, v)| {
            let json = to_json_at(&v, walk);
            (k, json)
        })
        .collect();
    Json::Object(map)
}

/// The `type` field of a success envelope.
pub fn type_name(value: &Value) -> String {
    value.type_name().to_string()
}
