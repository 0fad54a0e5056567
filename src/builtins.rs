//! Host functions installed by [`Namespace::with_builtins`].
//!
//! Queries rely on these for the checks the language itself leaves to the
//! host, most importantly `hasattr` to guard path steps inside predicates.

use regex::Regex;

use crate::{
    ast::BinOp,
    evaluator::{EvalError, arithmetic},
    function::NativeFunction,
    methods::expect_args,
    scope::Namespace,
    value::Value,
};

type Builtin = fn(&[Value]) -> Result<Value, EvalError>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("hasattr", builtin_hasattr),
    ("getattr", builtin_getattr),
    ("isinstance", builtin_isinstance),
    ("type", builtin_type),
    ("len", builtin_len),
    ("int", builtin_int),
    ("float", builtin_float),
    ("str", builtin_str),
    ("bool", builtin_bool),
    ("abs", builtin_abs),
    ("min", builtin_min),
    ("max", builtin_max),
    ("sum", builtin_sum),
    ("sorted", builtin_sorted),
    ("range", builtin_range),
    ("matches", builtin_matches),
];

pub(crate) fn install(namespace: &mut Namespace) {
    for (name, builtin) in BUILTINS {
        namespace.insert(*name, NativeFunction::new(name, *builtin));
    }
}

fn name_arg<'a>(function: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            "{}(): attribute name must be string, not '{}'",
            function,
            other.type_name()
        ))),
    }
}

/// hasattr(obj, name)
fn builtin_hasattr(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("hasattr", args, 2)?;
    let name = name_arg("hasattr", &args[1])?;
    Ok(Value::Boolean(args[0].has_attr(name)))
}

/// getattr(obj, name) or getattr(obj, name, default)
fn builtin_getattr(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [obj, name] => obj.get_attr(name_arg("getattr", name)?),
        [obj, name, default] => Ok(obj
            .get_attr(name_arg("getattr", name)?)
            .unwrap_or_else(|_| default.clone())),
        _ => Err(EvalError::Arity {
            function: "getattr".to_string(),
            expected: 2,
            got: args.len(),
        }),
    }
}

/// isinstance(value, "list") - compares against the value's type name
fn builtin_isinstance(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("isinstance", args, 2)?;
    match &args[1] {
        Value::String(name) => Ok(Value::Boolean(args[0].type_name() == name)),
        Value::List(names) => Ok(Value::Boolean(names.iter().any(
            |n| matches!(n, Value::String(name) if args[0].type_name() == name),
        ))),
        other => Err(EvalError::type_error(format!(
            "isinstance() expects a type name string, got '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_type(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("type", args, 1)?;
    Ok(Value::String(args[0].type_name().to_string()))
}

fn builtin_len(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("len", args, 1)?;
    let len = match &args[0] {
        Value::List(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Map(map) => map.len(),
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Integer(len as i64))
}

fn builtin_int(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("int", args, 1)?;
    match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
        Value::Float(n) if n.is_finite() => Ok(Value::Integer(n.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
            EvalError::Host(format!("invalid literal for int(): {:?}", s))
        }),
        other => Err(EvalError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_float(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("float", args, 1)?;
    match &args[0] {
        Value::Integer(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Boolean(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            EvalError::Host(format!("could not convert string to float: {:?}", s))
        }),
        other => Err(EvalError::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_str(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("str", args, 1)?;
    Ok(Value::String(args[0].to_string()))
}

fn builtin_bool(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("bool", args, 1)?;
    Ok(Value::Boolean(args[0].is_truthy()))
}

fn builtin_abs(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("abs", args, 1)?;
    match &args[0] {
        Value::Integer(n) => n.checked_abs().map(Value::Integer).ok_or(EvalError::Overflow),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(EvalError::type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

/// Items of a single list argument, or the arguments themselves.
fn candidates<'a>(function: &str, args: &'a [Value]) -> Result<&'a [Value], EvalError> {
    let items = match args {
        [Value::List(items)] => items.as_slice(),
        [_] => {
            return Err(EvalError::type_error(format!(
                "{}() expects a list or several arguments",
                function
            )));
        }
        items => items,
    };
    if items.is_empty() {
        return Err(EvalError::Host(format!("{}() arg is an empty sequence", function)));
    }
    Ok(items)
}

fn builtin_min(args: &[Value]) -> Result<Value, EvalError> {
    let items = candidates("min", args)?;
    let mut best = &items[0];
    for item in &items[1..] {
        if item.compare(best)?.is_lt() {
            best = item;
        }
    }
    Ok(best.clone())
}

fn builtin_max(args: &[Value]) -> Result<Value, EvalError> {
    let items = candidates("max", args)?;
    let mut best = &items[0];
    for item in &items[1..] {
        if item.compare(best)?.is_gt() {
            best = item;
        }
    }
    Ok(best.clone())
}

fn builtin_sum(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("sum", args, 1)?;
    let items = args[0].iterate()?;
    items
        .iter()
        .try_fold(Value::Integer(0), |acc, item| arithmetic(BinOp::Add, &acc, item))
}

/// sorted(list) or sorted(list, key_function); stable
fn builtin_sorted(args: &[Value]) -> Result<Value, EvalError> {
    let (items, key) = match args {
        [items] => (items.iterate()?, None),
        [items, key] => (items.iterate()?, Some(key)),
        _ => {
            return Err(EvalError::Arity {
                function: "sorted".to_string(),
                expected: 1,
                got: args.len(),
            });
        }
    };
    let keys = match key {
        Some(f) => items
            .iter()
            .map(|item| f.call(std::slice::from_ref(item)))
            .collect::<Result<Vec<_>, _>>()?,
        None => items.clone(),
    };

    let mut order: Vec<usize> = (0..items.len()).collect();
    let mut failure = None;
    order.sort_by(|&a, &b| {
        keys[a].compare(&keys[b]).unwrap_or_else(|e| {
            failure.get_or_insert(e);
            std::cmp::Ordering::Equal
        })
    });
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(Value::List(order.into_iter().map(|i| items[i].clone()).collect()))
}

/// range(stop) or range(start, stop)
fn builtin_range(args: &[Value]) -> Result<Value, EvalError> {
    let (start, stop) = match args {
        [Value::Integer(stop)] => (0, *stop),
        [Value::Integer(start), Value::Integer(stop)] => (*start, *stop),
        _ => return Err(EvalError::type_error("range() expects one or two integers")),
    };
    Ok(Value::List((start..stop).map(Value::Integer).collect()))
}

/// matches(string, pattern) - regex search
fn builtin_matches(args: &[Value]) -> Result<Value, EvalError> {
    expect_args("matches", args, 2)?;
    let pattern = match &args[1] {
        Value::String(p) => p,
        other => {
            return Err(EvalError::type_error(format!(
                "matches() pattern must be string, got {}",
                other.type_name()
            )));
        }
    };
    let re = Regex::new(pattern).map_err(|e| EvalError::Host(format!("invalid regex: {e}")))?;
    match &args[0] {
        Value::String(s) => Ok(Value::Boolean(re.is_match(s))),
        _ => Ok(Value::Boolean(false)),
    }
}
