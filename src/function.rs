//! Callable values: host functions and closures created by `function(...)`.

use std::fmt;
use std::sync::Arc;

use crate::{
    ast::Expr,
    evaluator::{EvalError, Evaluator, Options},
    scope::Scope,
    value::Value,
};

type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A host function exposed to queries.
///
/// # Examples
///
/// ```
/// use flwor_lang::{NativeFunction, Value};
///
/// let double = NativeFunction::new("double", |args| match args {
///     [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
///     _ => Ok(Value::None),
/// });
/// assert_eq!(double.call(&[Value::Integer(4)]).unwrap(), Value::Integer(8));
/// ```
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        NativeFunction {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native function {}>", self.name)
    }
}

/// A function literal closed over the scope it was evaluated in.
pub struct Closure {
    pub(crate) params: Arc<[String]>,
    pub(crate) body: Arc<Expr>,
    pub(crate) scope: Scope,
    /// `let` name the closure was bound to; rebound on every call so the
    /// body can recurse without the closure owning its own frame.
    pub(crate) name: Option<String>,
    pub(crate) options: Options,
}

impl Closure {
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    Native(NativeFunction),
    Closure(Arc<Closure>),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Native(f) => f.name(),
            Function::Closure(c) => c.name().unwrap_or("anonymous"),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        match self {
            Function::Native(f) => f.call(args),
            Function::Closure(c) => Evaluator::call_closure(c, args),
        }
    }

    /// Identity comparison; functions are never structurally equal.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => Arc::ptr_eq(&a.func, &b.func),
            (Function::Closure(a), Function::Closure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<NativeFunction> for Function {
    fn from(f: NativeFunction) -> Self {
        Function::Native(f)
    }
}
