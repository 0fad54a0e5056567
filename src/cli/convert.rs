//! JSON -> query value conversion

use crate::{Key, Map, Namespace, Value};

use super::CliError;

/// Convert serde_json::Value to a query Value; objects become mappings with
/// string keys in document order.
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::None),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => Value::Map(
            obj.into_iter()
                .map(|(k, v)| (Key::String(k), json_to_value(v)))
                .collect::<Map>(),
        ),
    }
}

/// Binds every member of a JSON object as a name, over the builtins.
pub fn json_to_namespace(v: serde_json::Value) -> Result<Namespace, CliError> {
    let obj = match v {
        serde_json::Value::Object(obj) => obj,
        other => return Err(CliError::InputNotObject(json_kind(&other))),
    };
    let mut namespace = Namespace::with_builtins();
    namespace.extend(obj.into_iter().map(|(k, v)| (k, json_to_value(v))));
    Ok(namespace)
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
