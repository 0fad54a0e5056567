//! Built-in methods of strings, lists and mappings.
//!
//! Attribute lookup on these values yields a bound method: a native function
//! that already holds its receiver, so `a.upper()` is an attribute access
//! followed by an ordinary call.

use crate::{
    evaluator::EvalError,
    function::NativeFunction,
    value::{Key, Value},
};

type Method = fn(&Value, &[Value]) -> Result<Value, EvalError>;

pub(crate) fn bound_method(receiver: &Value, name: &str) -> Option<Value> {
    let method: Method = match (receiver, name) {
        (Value::String(_), "upper") => method_upper,
        (Value::String(_), "lower") => method_lower,
        (Value::String(_), "strip") => method_strip,
        (Value::String(_), "startswith") => method_startswith,
        (Value::String(_), "endswith") => method_endswith,
        (Value::String(_), "split") => method_split,
        (Value::String(_), "replace") => method_replace,
        (Value::String(_), "find") => method_find,
        (Value::List(_), "count") => method_count,
        (Value::List(_), "index") => method_index,
        (Value::Map(_), "keys") => method_keys,
        (Value::Map(_), "values") => method_values,
        (Value::Map(_), "items") => method_items,
        (Value::Map(_), "get") => method_get,
        _ => return None,
    };
    let receiver = receiver.clone();
    Some(NativeFunction::new(name, move |args| method(&receiver, args)).into())
}

/// Checks the argument count of a native function or method.
pub(crate) fn expect_args(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Arity {
            function: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn string_arg<'a>(method: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            ".{}() argument must be str, got {}",
            method,
            other.type_name()
        ))),
    }
}

fn receiver_str(receiver: &Value) -> &str {
    match receiver {
        Value::String(s) => s,
        _ => "",
    }
}

// ========================================
// String Methods
// ========================================

/// .upper() - uppercase copy of the string
fn method_upper(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("upper", args, 0)?;
    Ok(Value::String(receiver_str(receiver).to_uppercase()))
}

/// .lower() - lowercase copy of the string
fn method_lower(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("lower", args, 0)?;
    Ok(Value::String(receiver_str(receiver).to_lowercase()))
}

/// .strip() - copy without leading and trailing whitespace
fn method_strip(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("strip", args, 0)?;
    Ok(Value::String(receiver_str(receiver).trim().to_string()))
}

fn method_startswith(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("startswith", args, 1)?;
    let prefix = string_arg("startswith", &args[0])?;
    Ok(Value::Boolean(receiver_str(receiver).starts_with(prefix)))
}

fn method_endswith(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("endswith", args, 1)?;
    let suffix = string_arg("endswith", &args[0])?;
    Ok(Value::Boolean(receiver_str(receiver).ends_with(suffix)))
}

/// .split() splits on whitespace, .split(sep) on the given separator
fn method_split(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let s = receiver_str(receiver);
    let parts: Vec<Value> = match args {
        [] => s.split_whitespace().map(Value::from).collect(),
        [sep] => {
            let sep = string_arg("split", sep)?;
            if sep.is_empty() {
                return Err(EvalError::type_error("empty separator"));
            }
            s.split(sep).map(Value::from).collect()
        }
        _ => return Err(EvalError::Arity {
            function: "split".to_string(),
            expected: 1,
            got: args.len(),
        }),
    };
    Ok(Value::List(parts))
}

fn method_replace(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("replace", args, 2)?;
    let from = string_arg("replace", &args[0])?;
    let to = string_arg("replace", &args[1])?;
    Ok(Value::String(receiver_str(receiver).replace(from, to)))
}

/// .find(sub) - character index of the first occurrence, or -1
fn method_find(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("find", args, 1)?;
    let s = receiver_str(receiver);
    let sub = string_arg("find", &args[0])?;
    let found = s
        .find(sub)
        .map(|byte| s[..byte].chars().count() as i64)
        .unwrap_or(-1);
    Ok(Value::Integer(found))
}

// ========================================
// List Methods
// ========================================

fn method_count(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("count", args, 1)?;
    let count = match receiver {
        Value::List(items) => items.iter().filter(|v| *v == &args[0]).count(),
        _ => 0,
    };
    Ok(Value::Integer(count as i64))
}

fn method_index(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("index", args, 1)?;
    match receiver {
        Value::List(items) => items
            .iter()
            .position(|v| v == &args[0])
            .map(|i| Value::Integer(i as i64))
            .ok_or_else(|| EvalError::Host(format!("{} is not in list", args[0]))),
        _ => Ok(Value::Integer(-1)),
    }
}

// ========================================
// Mapping Methods
// ========================================

fn method_keys(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("keys", args, 0)?;
    Ok(match receiver {
        Value::Map(map) => Value::List(map.keys().map(Key::to_value).collect()),
        _ => Value::List(vec![]),
    })
}

fn method_values(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("values", args, 0)?;
    Ok(match receiver {
        Value::Map(map) => Value::List(map.values().cloned().collect()),
        _ => Value::List(vec![]),
    })
}

/// .items() - list of (key, value) pairs in insertion order
fn method_items(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("items", args, 0)?;
    Ok(match receiver {
        Value::Map(map) => Value::List(
            map.iter()
                .map(|(k, v)| Value::List(vec![k.to_value(), v.clone()]))
                .collect(),
        ),
        _ => Value::List(vec![]),
    })
}

/// .get(key) or .get(key, default)
fn method_get(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let (key, default) = match args {
        [key] => (key, Value::None),
        [key, default] => (key, default.clone()),
        _ => {
            return Err(EvalError::Arity {
                function: "get".to_string(),
                expected: 2,
                got: args.len(),
            });
        }
    };
    match receiver {
        Value::Map(map) => Ok(map.get(&Key::from_value(key)?).cloned().unwrap_or(default)),
        _ => Ok(default),
    }
}
