//! Name resolution: the caller's namespace and the lexical frames layered
//! over it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{builtins, value::Value};

/// The caller-supplied name → value table a query is evaluated against.
///
/// Cloning is cheap; the table is shared and copied only when a clone is
/// modified.
///
/// # Examples
///
/// ```
/// use flwor_lang::{Namespace, Value};
///
/// let ns = Namespace::new().with("hello", "hello world!");
/// assert_eq!(ns.get("hello"), Some(&Value::from("hello world!")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    values: Arc<HashMap<String, Value>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace pre-populated with the builtin functions
    /// (`hasattr`, `isinstance`, `len`, `int`, ...).
    pub fn with_builtins() -> Self {
        let mut namespace = Self::new();
        builtins::install(&mut namespace);
        namespace
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.values).insert(name.into(), value.into());
    }

    /// Builder form of [`Namespace::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut namespace = Namespace::new();
        namespace.extend(iter);
        namespace
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Namespace {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let values = Arc::make_mut(&mut self.values);
        for (k, v) in iter {
            values.insert(k.into(), v.into());
        }
    }
}

/// A chain of lexical frames ending at a [`Namespace`].
///
/// Frames are immutable and shared: binding a name produces a new scope whose
/// parent is the old one, and closures keep a handle to the scope they were
/// created in.
#[derive(Clone)]
pub struct Scope(Arc<Frame>);

enum Frame {
    Root(Namespace),
    Local {
        bindings: Vec<(String, Value)>,
        parent: Scope,
    },
}

impl Scope {
    pub fn root(namespace: Namespace) -> Self {
        Scope(Arc::new(Frame::Root(namespace)))
    }

    /// New frame holding a single binding.
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Scope {
        self.extend(vec![(name.into(), value)])
    }

    /// New frame holding several bindings; later entries shadow earlier ones.
    pub fn extend(&self, bindings: Vec<(String, Value)>) -> Scope {
        Scope(Arc::new(Frame::Local {
            bindings,
            parent: self.clone(),
        }))
    }

    /// Resolves a name innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = self;
        loop {
            match scope.0.as_ref() {
                Frame::Local { bindings, parent } => {
                    if let Some((_, value)) = bindings.iter().rev().find(|(n, _)| n == name) {
                        return Some(value.clone());
                    }
                    scope = parent;
                }
                Frame::Root(namespace) => return namespace.get(name).cloned(),
            }
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_ref() {
            Frame::Root(namespace) => write!(f, "Scope(<namespace of {}>)", namespace.len()),
            Frame::Local { bindings, parent } => {
                let names: Vec<&str> = bindings.iter().map(|(n, _)| n.as_str()).collect();
                write!(f, "Scope({:?}) -> {:?}", names, parent)
            }
        }
    }
}
