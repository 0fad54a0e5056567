use std::cell::Cell;
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Path, PathStep, Query, UnaryOp},
    function::{Closure, Function},
    scope::{Namespace, Scope},
    value::{Key, Map, Value},
};

/// Errors that can occur during query evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Attribute lookup found no such attribute on the value
    #[error("'{type_name}' object has no attribute '{attribute}'")]
    Attribute { type_name: String, attribute: String },

    /// Name bound neither in a local frame nor in the namespace
    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    Type(String),

    /// List or string index out of range
    #[error("index {index} out of range for length {len}")]
    Index { index: i64, len: usize },

    /// Mapping subscript with a missing key
    #[error("key {0} not found")]
    Key(String),

    #[error("'{0}' object is not callable")]
    NotCallable(String),

    #[error("{function}() takes {expected} argument(s) but {got} were given")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    /// Closure calls nested deeper than [`Options::max_call_depth`]
    #[error("maximum call depth of {0} exceeded")]
    RecursionLimit(usize),

    /// Failure reported by a host function
    #[error("{0}")]
    Host(String),
}

impl EvalError {
    pub fn attribute(type_name: &str, attribute: &str) -> Self {
        EvalError::Attribute {
            type_name: type_name.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }
}

/// Evaluation settings carried by a compiled query and the closures it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Maximum nesting of closure calls before evaluation fails with
    /// [`EvalError::RecursionLimit`]. The default fits a 2 MiB thread stack
    /// in unoptimised builds; raise it only for threads with larger stacks.
    pub max_call_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_call_depth: 32,
        }
    }
}

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks closure nesting on the current thread for the duration of a call.
struct CallGuard;

impl CallGuard {
    fn enter(limit: usize) -> Result<Self, EvalError> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= limit {
                return Err(EvalError::RecursionLimit(limit));
            }
            depth.set(depth.get() + 1);
            Ok(CallGuard)
        })
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// The query evaluator.
///
/// Walks the AST against a [`Scope`]. It holds no per-invocation state, so
/// one evaluator can serve any number of concurrent invocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    options: Options,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Evaluator { options }
    }

    /// Evaluates a complete query against a namespace.
    ///
    /// Path queries and bare expressions produce a list; FLWOR chains produce
    /// whatever their terminal clause builds.
    ///
    /// # Examples
    ///
    /// ```
    /// use flwor_lang::{Evaluator, Lexer, Namespace, Parser, Value};
    ///
    /// let mut parser = Parser::new(Lexer::new("hello")).unwrap();
    /// let query = parser.parse_query().unwrap();
    ///
    /// let ns = Namespace::new().with("hello", "hello world!");
    /// let result = Evaluator::new().eval_query(&query, ns).unwrap();
    /// assert_eq!(result, Value::List(vec![Value::from("hello world!")]));
    /// ```
    pub fn eval_query(&self, query: &Query, namespace: Namespace) -> Result<Value, EvalError> {
        let scope = Scope::root(namespace);
        match query {
            Query::Path(path) => self.eval_path(path, &scope).map(Value::List),
            Query::Expression(expr) => Ok(Value::List(vec![self.eval_expr(expr, &scope)?])),
            Query::Flwor(flwor) => self.eval_flwor(flwor, &scope),
        }
    }

    pub(crate) fn eval_expr(&self, expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
        match expr {
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Integer(n) => Ok(Value::Integer(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::None => Ok(Value::None),
            Expr::Name(name) => lookup(scope, name),
            Expr::ScalarWrap(name) => Ok(Value::List(vec![lookup(scope, name)?])),
            Expr::Path(path) => self.eval_path(path, scope).map(Value::List),
            Expr::Attribute { object, name } => self.eval_expr(object, scope)?.get_attr(name),
            Expr::Index { object, index } => {
                let container = self.eval_expr(object, scope)?;
                let key = self.eval_expr(index, scope)?;
                container.index(&key)
            }
            Expr::Call { callee, args } => {
                let function = self.eval_expr(callee, scope)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                function.call(&args)
            }
            Expr::BinaryOp { op, left, right } => match op {
                BinOp::And => {
                    let left_val = self.eval_expr(left, scope)?;
                    if left_val.is_truthy() {
                        self.eval_expr(right, scope)
                    } else {
                        Ok(left_val)
                    }
                }
                BinOp::Or => {
                    let left_val = self.eval_expr(left, scope)?;
                    if left_val.is_truthy() {
                        Ok(left_val)
                    } else {
                        self.eval_expr(right, scope)
                    }
                }
                _ => {
                    let left_val = self.eval_expr(left, scope)?;
                    let right_val = self.eval_expr(right, scope)?;
                    apply_binop(*op, &left_val, &right_val)
                }
            },
            Expr::UnaryOp { op, operand } => {
                let value = self.eval_expr(operand, scope)?;
                apply_unary(*op, &value)
            }
            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition, scope)?.is_truthy() {
                    self.eval_expr(then_branch, scope)
                } else {
                    self.eval_expr(else_branch, scope)
                }
            }
            Expr::List(items) | Expr::Tuple(items) => items
                .iter()
                .map(|item| self.eval_expr(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let key = Key::from_value(&self.eval_expr(key, scope)?)?;
                    map.insert(key, self.eval_expr(value, scope)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Function { params, body } => Ok(self.closure(params, body, scope, None)),
            Expr::Block(flwor) => self.eval_flwor(flwor, scope),
        }
    }

    /// Runs a path left to right over a current sequence.
    ///
    /// Attribute steps splice list-valued attributes one level deep;
    /// predicates filter in place with `self` bound to each candidate.
    fn eval_path(&self, path: &Path, scope: &Scope) -> Result<Vec<Value>, EvalError> {
        let mut current = vec![lookup(scope, &path.root)?];

        for step in &path.steps {
            current = match step {
                PathStep::Attribute(name) => {
                    let mut next = Vec::with_capacity(current.len());
                    for candidate in &current {
                        match candidate.get_attr(name)? {
                            Value::List(items) => next.extend(items),
                            value => next.push(value),
                        }
                    }
                    next
                }
                PathStep::Predicate(predicate) => {
                    let mut kept = Vec::with_capacity(current.len());
                    for candidate in current {
                        let frame = scope.bind("self", candidate.clone());
                        if self.eval_expr(predicate, &frame)?.is_truthy() {
                            kept.push(candidate);
                        }
                    }
                    kept
                }
            };
        }
        Ok(current)
    }

    /// Builds a closure over `scope`. A `name` makes the closure visible to
    /// its own body under that name.
    pub(crate) fn closure(
        &self,
        params: &Arc<[String]>,
        body: &Arc<Expr>,
        scope: &Scope,
        name: Option<String>,
    ) -> Value {
        Value::Function(Function::Closure(Arc::new(Closure {
            params: Arc::clone(params),
            body: Arc::clone(body),
            scope: scope.clone(),
            name,
            options: self.options,
        })))
    }

    /// Binds arguments in a fresh frame over the captured scope and evaluates
    /// the body.
    pub(crate) fn call_closure(closure: &Arc<Closure>, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != closure.params.len() {
            return Err(EvalError::Arity {
                function: closure.name().unwrap_or("anonymous function").to_string(),
                expected: closure.params.len(),
                got: args.len(),
            });
        }
        let _guard = CallGuard::enter(closure.options.max_call_depth)?;

        let mut bindings = Vec::with_capacity(args.len() + 1);
        if let Some(name) = &closure.name {
            bindings.push((
                name.clone(),
                Value::Function(Function::Closure(Arc::clone(closure))),
            ));
        }
        bindings.extend(closure.params.iter().cloned().zip(args.iter().cloned()));

        debug!(
            "calling {} with {} argument(s)",
            closure.name().unwrap_or("anonymous function"),
            args.len()
        );
        let scope = closure.scope.extend(bindings);
        Evaluator::with_options(closure.options).eval_expr(&closure.body, &scope)
    }
}

fn lookup(scope: &Scope, name: &str) -> Result<Value, EvalError> {
    scope
        .lookup(name)
        .ok_or_else(|| EvalError::UndefinedName(name.to_string()))
}

fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Boolean(!value.is_truthy())),
        (UnaryOp::Negate, Value::Integer(n)) => {
            n.checked_neg().map(Value::Integer).ok_or(EvalError::Overflow)
        }
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Negate, other) => Err(EvalError::type_error(format!(
            "bad operand type for unary -: '{}'",
            other.type_name()
        ))),
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Equal => Ok(Value::Boolean(left == right)),
        BinOp::NotEqual => Ok(Value::Boolean(left != right)),
        BinOp::LessThan => Ok(Value::Boolean(left.compare(right)?.is_lt())),
        BinOp::GreaterThan => Ok(Value::Boolean(left.compare(right)?.is_gt())),
        BinOp::LessEqual => Ok(Value::Boolean(left.compare(right)?.is_le())),
        BinOp::GreaterEqual => Ok(Value::Boolean(left.compare(right)?.is_ge())),
        BinOp::In => Ok(Value::Boolean(right.contains(left)?)),
        BinOp::NotIn => Ok(Value::Boolean(!right.contains(left)?)),
        // Short-circuit forms never reach here with both operands evaluated
        BinOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
        _ => arithmetic(op, left, right),
    }
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> EvalError {
    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Subtract => "-",
        BinOp::Multiply => "*",
        BinOp::Divide => "/",
        BinOp::FloorDivide => "//",
        BinOp::Modulo => "%",
        _ => "?",
    };
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        left.type_name(),
        right.type_name()
    ))
}

/// Arithmetic on values.
///
/// Integers stay integers except under `/`, which always yields a float.
/// `//` floors and `%` takes the sign of the divisor.
pub(crate) fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use Value::{Float, Integer, List};

    match (op, left, right) {
        (BinOp::Add, Integer(a), Integer(b)) => a.checked_add(*b).map(Integer).ok_or(EvalError::Overflow),
        (BinOp::Subtract, Integer(a), Integer(b)) => {
            a.checked_sub(*b).map(Integer).ok_or(EvalError::Overflow)
        }
        (BinOp::Multiply, Integer(a), Integer(b)) => {
            a.checked_mul(*b).map(Integer).ok_or(EvalError::Overflow)
        }
        (BinOp::FloorDivide, Integer(a), Integer(b)) => floor_div(*a, *b).map(Integer),
        (BinOp::Modulo, Integer(a), Integer(b)) => modulo(*a, *b).map(Integer),

        (BinOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (BinOp::Add, List(a), List(b)) => Ok(List(a.iter().chain(b.iter()).cloned().collect())),
        (BinOp::Multiply, Value::String(s), Integer(n)) | (BinOp::Multiply, Integer(n), Value::String(s)) => {
            let times = repeat_count(s.len(), *n)?;
            Ok(Value::String(s.repeat(times)))
        }
        (BinOp::Multiply, List(items), Integer(n)) | (BinOp::Multiply, Integer(n), List(items)) => {
            let times = repeat_count(items.len(), *n)?;
            Ok(List(items.iter().cloned().cycle().take(items.len() * times).collect()))
        }

        (op, a, b) => {
            let (Some(x), Some(y)) = (a.as_float(), b.as_float()) else {
                return Err(unsupported(op, a, b));
            };
            match op {
                BinOp::Add => Ok(Float(x + y)),
                BinOp::Subtract => Ok(Float(x - y)),
                BinOp::Multiply => Ok(Float(x * y)),
                BinOp::Divide if y == 0.0 => Err(EvalError::DivisionByZero),
                BinOp::Divide => Ok(Float(x / y)),
                BinOp::FloorDivide if y == 0.0 => Err(EvalError::DivisionByZero),
                BinOp::FloorDivide => Ok(Float((x / y).floor())),
                BinOp::Modulo if y == 0.0 => Err(EvalError::DivisionByZero),
                BinOp::Modulo => Ok(Float(x - y * (x / y).floor())),
                _ => Err(unsupported(op, a, b)),
            }
        }
    }
}

/// Upper bound on the length of a repeated string or list.
const MAX_REPEAT_LEN: usize = 1 << 28;

/// Repetition count for `seq * n`; negative counts repeat zero times.
fn repeat_count(len: usize, n: i64) -> Result<usize, EvalError> {
    let times = usize::try_from(n).unwrap_or(0);
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(EvalError::Overflow),
    }
}

fn floor_div(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn modulo(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}
