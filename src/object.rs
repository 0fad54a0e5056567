//! Host objects with attributes.
//!
//! Path navigation and `.name` access reach host data through the [`Object`]
//! trait, so the evaluator never needs to know the concrete host type.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;

/// An attribute-bearing host value.
///
/// Implementations must be safe to read from several threads at once, since a
/// compiled query may be invoked concurrently over the same namespace.
pub trait Object: fmt::Debug + Send + Sync {
    /// Name reported by `type()` and matched by `isinstance`.
    fn type_name(&self) -> &str;

    /// Looks up an attribute; `None` means the attribute is absent.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Names of the attributes, used when printing the object.
    fn attr_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_truthy(&self) -> bool {
        true
    }
}

/// A plain object: a type name and an ordered attribute table.
///
/// # Examples
///
/// ```
/// use flwor_lang::{Record, Value};
///
/// let a = Record::new("A").with("q", 5).into_value();
/// assert_eq!(a.get_attr("q").unwrap(), Value::Integer(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record {
    type_name: String,
    attrs: IndexMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            attrs: IndexMap::new(),
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl Object for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).cloned()
    }

    fn attr_names(&self) -> Vec<String> {
        self.attrs.keys().cloned().collect()
    }
}
