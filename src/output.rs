//! JSON output serialization for query results.
//!
//! This module provides JSON serialization with support for both compact and
//! pretty-printed output formats. Values JSON has no notation for are mapped
//! onto the nearest JSON form:
//!
//! - **Mapping keys** - non-string keys are rendered with their display form
//!   (`1`, `True`, `(1, 2)` style tuples print as `[1, 2]`)
//! - **Objects** - printed as JSON objects of their attributes
//! - **Functions** - printed as the string `"<function name>"`
//! - **Floats** - non-finite floats print as `null`
//!
//! Mapping entries keep their insertion order.
//!
//! # Examples
//!
//! ```
//! use flwor_lang::Value;
//! use flwor_lang::output::{to_json, to_json_pretty};
//!
//! let value = Value::Integer(42);
//!
//! // Compact output
//! assert_eq!(to_json(&value), "42");
//!
//! // Pretty output (identical for simple values)
//! assert_eq!(to_json_pretty(&value), "42");
//! ```

use crate::object::Object;
use crate::value::{Key, Value};

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::None => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) if !n.is_finite() => "null".to_string(),
            Value::Float(n) if n.fract() == 0.0 => format!("{:.1}", n),
            Value::Float(n) => n.to_string(),
            Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            Value::List(items) => self.print_array(items, indent),
            Value::Map(map) => {
                let entries: Vec<(String, &Value)> =
                    map.iter().map(|(k, v)| (key_text(k), v)).collect();
                self.print_object(&entries, indent)
            }
            Value::Object(obj) => self.print_host_object(obj.as_ref(), indent),
            Value::Function(func) => format!("\"<function {}>\"", self.escape_string(func.name())),
        }
    }

    fn print_host_object(&self, obj: &dyn Object, indent: usize) -> String {
        let attrs: Vec<(String, Value)> = obj
            .attr_names()
            .into_iter()
            .filter_map(|name| obj.get_attr(&name).map(|v| (name, v)))
            .collect();
        let entries: Vec<(String, &Value)> = attrs.iter().map(|(k, v)| (k.clone(), v)).collect();
        self.print_object(&entries, indent)
    }

    fn print_array(&self, arr: &[Value], indent: usize) -> String {
        if arr.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let mut result = "[\n".to_string();
            let items: Vec<String> = arr
                .iter()
                .map(|v| {
                    format!(
                        "{}{}",
                        self.indent(indent + 1),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            result.push_str(&items.join(",\n"));
            result.push('\n');
            result.push_str(&self.indent(indent));
            result.push(']');
            result
        } else {
            let items: Vec<String> = arr.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_object(&self, entries: &[(String, &Value)], indent: usize) -> String {
        if entries.is_empty() {
            return "{}".to_string();
        }

        if self.pretty {
            let mut result = "{\n".to_string();
            let items: Vec<String> = entries
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}\"{}\": {}",
                        self.indent(indent + 1),
                        self.escape_string(k),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            result.push_str(&items.join(",\n"));
            result.push('\n');
            result.push_str(&self.indent(indent));
            result.push('}');
            result
        } else {
            let items: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("\"{}\":{}", self.escape_string(k), self.print_value(v, indent)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

fn key_text(key: &Key) -> String {
    match key {
        Key::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Converts a Value to compact JSON string representation.
///
/// # Examples
///
/// ```
/// use flwor_lang::{Key, Map, Value};
/// use flwor_lang::output::to_json;
///
/// let mut map = Map::new();
/// map.insert(Key::from("name"), Value::from("Alice"));
/// map.insert(Key::from(1), Value::from(30));
///
/// assert_eq!(to_json(&Value::Map(map)), r#"{"name":"Alice","1":30}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a Value to pretty-printed JSON with 2-space indentation.
///
/// # Examples
///
/// ```
/// use flwor_lang::{Record, Value};
/// use flwor_lang::output::to_json_pretty;
///
/// let obj = Record::new("A").with("q", 5).with("r", "x").into_value();
/// assert_eq!(to_json_pretty(&obj), "{\n  \"q\": 5,\n  \"r\": \"x\"\n}");
/// ```
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}
