use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    evaluator::EvalError,
    function::{Function, NativeFunction},
    methods,
    object::Object,
};

/// Insertion-ordered mapping, as produced by mapping literals and `collect`.
pub type Map = IndexMap<Key, Value>;

/// A value a query can navigate, compute with, or return.
///
/// The evaluator only relies on the capability methods defined here
/// (attribute lookup, calls, indexing, iteration, truthiness), never on the
/// concrete host representation behind [`Value::Object`].
///
/// # Examples
///
/// ```
/// use flwor_lang::Value;
///
/// let list = Value::from(vec![Value::Integer(1), Value::Integer(2)]);
/// assert!(list.is_sequence());
/// assert!(list.is_truthy());
/// assert!(!Value::Integer(0).is_truthy());
/// assert_eq!(Value::Integer(1), Value::Float(1.0));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent value
    None,

    Boolean(bool),

    Integer(i64),

    Float(f64),

    String(String),

    /// Ordered sequence; tuples produced by the engine are lists as well
    List(Vec<Value>),

    /// Insertion-ordered mapping
    Map(Map),

    /// Host object with attributes
    Object(Arc<dyn Object>),

    /// Host function or closure
    Function(Function),
}

impl Value {
    /// Type name as reported by `type()` and matched by `isinstance`.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Object(obj) => obj.type_name(),
            Value::Function(_) => "function",
        }
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(obj) => obj.is_truthy(),
            Value::Function(_) => true,
        }
    }

    /// Whether path navigation splices this value instead of appending it.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Elements of a `for` source: list items, mapping keys or characters.
    pub fn iterate(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Map(map) => Ok(map.keys().map(Key::to_value).collect()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            other => Err(EvalError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Looks up an attribute, falling back to the built-in methods of strings,
    /// lists and mappings. String keys of a mapping count as attributes.
    pub fn get_attr(&self, name: &str) -> Result<Value, EvalError> {
        match self {
            Value::Object(obj) => obj
                .get_attr(name)
                .ok_or_else(|| EvalError::attribute(obj.type_name(), name)),
            Value::Map(map) => match map.get(&Key::String(name.to_string())) {
                Some(value) => Ok(value.clone()),
                None => methods::bound_method(self, name)
                    .ok_or_else(|| EvalError::attribute(self.type_name(), name)),
            },
            _ => methods::bound_method(self, name)
                .ok_or_else(|| EvalError::attribute(self.type_name(), name)),
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_ok()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(EvalError::NotCallable(other.type_name().to_string())),
        }
    }

    /// Subscript access: `list[int]`, `str[int]` or `map[key]`.
    ///
    /// Negative indexes count from the end of lists and strings.
    pub fn index(&self, key: &Value) -> Result<Value, EvalError> {
        match (self, key) {
            (Value::List(items), Value::Integer(n)) => resolve_index(*n, items.len())
                .map(|i| items[i].clone())
                .ok_or(EvalError::Index {
                    index: *n,
                    len: items.len(),
                }),
            (Value::String(s), Value::Integer(n)) => {
                let chars: Vec<char> = s.chars().collect();
                resolve_index(*n, chars.len())
                    .map(|i| Value::String(chars[i].to_string()))
                    .ok_or(EvalError::Index {
                        index: *n,
                        len: chars.len(),
                    })
            }
            (Value::Map(map), key) => {
                let k = Key::from_value(key)?;
                map.get(&k).cloned().ok_or_else(|| EvalError::Key(k.to_string()))
            }
            (Value::List(_) | Value::String(_), other) => Err(EvalError::type_error(format!(
                "{} indices must be integers, not {}",
                self.type_name(),
                other.type_name()
            ))),
            (other, _) => Err(EvalError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// Membership test backing `in` / `not in`.
    pub fn contains(&self, item: &Value) -> Result<bool, EvalError> {
        match (self, item) {
            (Value::List(items), item) => Ok(items.iter().any(|v| v == item)),
            (Value::Map(map), item) => Ok(map.contains_key(&Key::from_value(item)?)),
            (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
            (Value::String(_), other) => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
            (other, _) => Err(EvalError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Total order used by comparisons and `order by`.
    ///
    /// Numbers compare across integer and float, strings and booleans among
    /// themselves, lists lexicographically; anything else is a type error.
    pub fn compare(&self, other: &Value) -> Result<Ordering, EvalError> {
        let unsupported = || {
            EvalError::type_error(format!(
                "ordering not supported between instances of '{}' and '{}'",
                self.type_name(),
                other.type_name()
            ))
        };
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ordering => return Ok(ordering),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(unsupported),
                _ => Err(unsupported()),
            },
        }
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs() as usize)?
    } else {
        index as usize
    };
    (resolved < len).then_some(resolved)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v == w))
            }
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", Repr(other)),
        }
    }
}

/// Quoted rendering used for nested values and error messages.
struct Repr<'a>(&'a Value);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::None => write!(f, "None"),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{:.1}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Repr(item))?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", Repr(&k.to_value()), Repr(v))?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => write!(f, "<{} object>", obj.type_name()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Value::Function(Function::Native(f))
    }
}

/// The hashable subset of [`Value`], used as mapping keys.
///
/// Integral floats are stored as integers so `1` and `1.0` address the same
/// entry; lists become tuple keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Boolean(bool),
    Integer(i64),
    Float(FloatKey),
    String(String),
    Tuple(Vec<Key>),
}

/// Bit pattern of a non-integral float key.
#[derive(Debug, Clone, Copy)]
pub struct FloatKey(f64);

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatKey {}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Key {
    pub fn from_value(value: &Value) -> Result<Key, EvalError> {
        match value {
            Value::None => Ok(Key::None),
            Value::Boolean(b) => Ok(Key::Boolean(*b)),
            Value::Integer(n) => Ok(Key::Integer(*n)),
            Value::Float(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    Ok(Key::Integer(*n as i64))
                } else {
                    Ok(Key::Float(FloatKey(*n)))
                }
            }
            Value::String(s) => Ok(Key::String(s.clone())),
            Value::List(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Key::Tuple),
            other => Err(EvalError::type_error(format!(
                "unhashable type: '{}'",
                other.type_name()
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Boolean(b) => Value::Boolean(*b),
            Key::Integer(n) => Value::Integer(*n),
            Key::Float(FloatKey(n)) => Value::Float(*n),
            Key::String(s) => Value::String(s.clone()),
            Key::Tuple(keys) => Value::List(keys.iter().map(Key::to_value).collect()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Integer(n)
    }
}
