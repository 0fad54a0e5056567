// tests/integration_tests.rs

use flwor_lang::{
    EvalError, Key, Map, NativeFunction, Namespace, Record, Value, compile, execute, to_json,
};

fn exec(query: &str, ns: &Namespace) -> Value {
    execute(query, ns).unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e))
}

fn eval_err(query: &str, ns: &Namespace) -> EvalError {
    match compile(query).unwrap().call(ns) {
        Err(e) => e,
        Ok(v) => panic!("query {:?} unexpectedly produced {}", query, v),
    }
}

fn list(values: Vec<Value>) -> Value {
    Value::List(values)
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|n| Value::Integer(*n)).collect()
}

fn record(type_name: &str, q: impl Into<Value>) -> Record {
    Record::new(type_name).with("q", q)
}

/// `[1..7, [1..7, [1..8]]]`
fn nested_list() -> Value {
    let inner = ints(&[1, 2, 3, 4, 5, 6, 7, 8]);
    let mut middle = ints(&[1, 2, 3, 4, 5, 6, 7]);
    let mut outer = ints(&[1, 2, 3, 4, 5, 6, 7]);
    middle.push(list(inner));
    outer.push(list(middle));
    list(outer)
}

fn hello_ns() -> Namespace {
    Namespace::with_builtins().with("a", "hello")
}

fn host_functions(ns: Namespace) -> Namespace {
    ns.with("f", NativeFunction::new("f", |_| Ok(Value::from("hello"))))
        .with(
            "g",
            NativeFunction::new("g", |args| {
                args.iter()
                    .try_fold(Value::Integer(0), |acc, v| match (acc, v) {
                        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
                        _ => Err(EvalError::type_error("g() expects integers")),
                    })
            }),
        )
        .with(
            "h",
            NativeFunction::new("h", |args| match args {
                [f, x] => f.call(std::slice::from_ref(x)),
                _ => Err(EvalError::type_error("h() takes two arguments")),
            }),
        )
        .with(
            "i",
            NativeFunction::new("i", |args| match args {
                [Value::Integer(x)] => Ok(Value::Integer(x * x)),
                _ => Err(EvalError::type_error("i() takes an integer")),
            }),
        )
        .with(
            "j",
            NativeFunction::new("j", |args| match args {
                [f] => Ok(f.clone()),
                _ => Err(EvalError::type_error("j() takes one argument")),
            }),
        )
}

// ============================================================================
// Names and Paths
// ============================================================================

#[test]
fn test_hello() {
    let ns = Namespace::new().with("hello", "hello world!");
    let query = compile("hello").unwrap();
    assert_eq!(query.call(&ns).unwrap(), list(vec![Value::from("hello world!")]));
}

#[test]
fn test_iterdown() {
    let mut first = record("A", "asdf");
    first.set("y", record("A", "o.x.y").into_value());
    let children = vec![first.into_value(), record("A", "123").into_value()];
    let mut o = record("A", "top");
    o.set("x", children.clone());

    let ns = Namespace::with_builtins().with("o", o.into_value());
    assert_eq!(
        exec(r#"o/x[hasattr(self,"y")]/y/q"#, &ns),
        list(vec![Value::from("o.x.y")])
    );
    // list-valued attributes are spliced and keep object identity
    assert_eq!(exec("o/x", &ns), list(children));
}

#[test]
fn test_path_over_missing_attribute_fails() {
    let o = Record::new("A").with("x", vec![record("A", 1).into_value()]);
    let ns = Namespace::new().with("o", o.into_value());
    assert_eq!(
        eval_err("o/x/y", &ns),
        EvalError::Attribute {
            type_name: "A".to_string(),
            attribute: "y".to_string()
        }
    );
}

#[test]
fn test_splicing_is_one_level_per_step() {
    let o = Record::new("O").with("x", vec![list(ints(&[1, 2])), Value::Integer(3)]);
    let ns = Namespace::new().with("o", o.into_value());
    assert_eq!(
        exec("o/x", &ns),
        list(vec![list(ints(&[1, 2])), Value::Integer(3)])
    );
}

#[test]
fn test_path_on_mappings() {
    let mut inner = Map::new();
    inner.insert(Key::from("name"), Value::from("leaf"));
    let mut outer = Map::new();
    outer.insert(Key::from("child"), Value::Map(inner));
    let ns = Namespace::new().with("m", Value::Map(outer));
    assert_eq!(exec("m/child/name", &ns), list(vec![Value::from("leaf")]));
}

#[test]
fn test_undefined_root() {
    assert_eq!(
        eval_err("nothing/here", &Namespace::new()),
        EvalError::UndefinedName("nothing".to_string())
    );
}

// ============================================================================
// Comparison Predicates
// ============================================================================

#[test]
fn test_cmpops() {
    let a = record("A", 5).into_value();
    let ns = Namespace::new().with("a", a.clone());
    let hit = list(vec![a]);
    let miss = list(vec![]);

    let cases = [
        ("a[self.q == 5]", &hit),
        ("a[self.q != 5]", &miss),
        ("a[self.q >= 5]", &hit),
        ("a[self.q <= 5]", &hit),
        ("a[self.q > 5]", &miss),
        ("a[self.q < 5]", &miss),
        ("a[self.q == 7]", &miss),
        ("a[self.q != 7]", &hit),
        ("a[self.q >= 7]", &miss),
        ("a[self.q <= 7]", &hit),
        ("a[self.q > 7]", &miss),
        ("a[self.q < 7]", &hit),
        ("a[self.q == 3]", &miss),
        ("a[self.q != 3]", &hit),
        ("a[self.q >= 3]", &hit),
        ("a[self.q <= 3]", &miss),
        ("a[self.q > 3]", &hit),
        ("a[self.q < 3]", &miss),
    ];
    for (query, expected) in cases {
        assert_eq!(&exec(query, &ns), expected, "Failed for query: {}", query);
    }
}

#[test]
fn test_ordering_incomparable_types_fails() {
    let ns = Namespace::new().with("a", "hello");
    assert!(matches!(eval_err("a[self < 3]", &ns), EvalError::Type(_)));
}

// ============================================================================
// Boolean Predicates
// ============================================================================

#[test]
fn test_smpl_boolean_exprs() {
    let ns = hello_ns();
    let hit = list(vec![Value::from("hello")]);
    let miss = list(vec![]);

    let cases = [
        ("a[true]", &hit),
        ("a[false]", &miss),
        ("a[not true]", &miss),
        ("a[not false]", &hit),
        ("a[true and true]", &hit),
        ("a[false and true]", &miss),
        ("a[not true and true]", &miss),
        ("a[not false and true]", &hit),
        ("a[true or false]", &hit),
        ("a[true or true]", &hit),
        ("a[false or true]", &hit),
        ("a[false or false]", &miss),
        ("a[not true or true]", &hit),
        ("a[not false or false]", &hit),
        ("a[true and true and true and true]", &hit),
        ("a[true and true and true and false]", &miss),
    ];
    for (query, expected) in cases {
        assert_eq!(&exec(query, &ns), expected, "Failed for query: {}", query);
    }
}

#[test]
fn test_nested_boolean_exprs() {
    let ns = hello_ns();
    let hit = list(vec![Value::from("hello")]);
    let miss = list(vec![]);

    let cases = [
        ("a[true and (false or true)]", &hit),
        ("a[true and (false and true)]", &miss),
        ("a[true and (true and true)]", &hit),
        ("a[true and (true and (not true or false))]", &miss),
        ("a[1 and (1 and (not 1 or 0))]", &miss),
        ("a[1 and (1 and (not 1 or (1 and 0 or (1 and 1))))]", &hit),
    ];
    for (query, expected) in cases {
        assert_eq!(&exec(query, &ns), expected, "Failed for query: {}", query);
    }
}

#[test]
fn test_and_or_return_operands() {
    let ns = Namespace::new();
    assert_eq!(exec("0 or 'x'", &ns), list(vec![Value::from("x")]));
    assert_eq!(exec("1 and 2", &ns), list(vec![Value::Integer(2)]));
    assert_eq!(exec("[] and missing", &ns), list(vec![list(vec![])]));
}

// ============================================================================
// Predicate Values
// ============================================================================

#[test]
fn test_simple_where_values() {
    let ns = hello_ns();
    let hit = list(vec![Value::from("hello")]);

    for query in [
        "a[1 == 1]",
        "a[-1 == -1]",
        "a[2.2 == 2.2]",
        r#"a[2.2 == float("2.2")]"#,
        "a[2 == int(2.2)]",
        r#"a["hello" == a]"#,
        r#"a["HELLO" == a.upper()]"#,
    ] {
        assert_eq!(exec(query, &ns), hit, "Failed for query: {}", query);
    }
}

#[test]
fn test_func_where_values() {
    let ns = host_functions(hello_ns());
    let hit = list(vec![Value::from("hello")]);

    for query in [
        "a[f()]",
        r#"a[f() == "hello"]"#,
        "a[g(1,2,3) == 6]",
        "a[h(i,3) == 9]",
        "a[i(j(j)(j)(j)(h)(i,3)) == 81]",
    ] {
        assert_eq!(exec(query, &ns), hit, "Failed for query: {}", query);
    }
}

#[test]
fn test_list_where_values() {
    let ns = hello_ns().with("l", nested_list());
    let hit = list(vec![Value::from("hello")]);

    for query in [
        "a[l[0] == 1]",
        "a[l[1] == 2]",
        "a[l[7][0] == 1]",
        "a[l[7][1] == 2]",
        "a[l[7][7][0] == 1]",
        "a[l[7][7][1] == 2]",
        "a[l[7][7][7] == 8]",
        "a[l[-1][-1][-1] == 8]",
    ] {
        assert_eq!(exec(query, &ns), hit, "Failed for query: {}", query);
    }
}

#[test]
fn test_dict_where_values() {
    let mut deepest = Map::new();
    deepest.insert(Key::from("one"), Value::Integer(1));
    deepest.insert(Key::from("two"), Value::Integer(2));
    let mut next = deepest.clone();
    next.insert(Key::from("next"), Value::Map(deepest.clone()));
    let mut l = deepest;
    l.insert(Key::from("next"), Value::Map(next));

    let ns = hello_ns().with("l", Value::Map(l));
    let hit = list(vec![Value::from("hello")]);

    for query in [
        r#"a[l["one"] == 1]"#,
        r#"a[l["two"] == 2]"#,
        r#"a[l["next"]["one"] == 1]"#,
        r#"a[l["next"]["two"] == 2]"#,
        r#"a[l["next"]["next"]["one"] == 1]"#,
        r#"a[l["next"]["next"]["two"] == 2]"#,
        "a[l.next.next.two == 2]",
    ] {
        assert_eq!(exec(query, &ns), hit, "Failed for query: {}", query);
    }
}

#[test]
fn test_callable_where_values() {
    let ns = host_functions(hello_ns());
    let j = ns.get("j").cloned().unwrap();
    let mut m = Map::new();
    m.insert(Key::from("one"), Value::Integer(1));
    m.insert(Key::from("two"), Value::Integer(2));
    let mut next = ints(&[1, 2, 3, 4, 5, 6, 7]);
    next.push(j);
    m.insert(Key::from("next"), list(next));
    let ns = ns.with("m", Value::Map(m));

    assert_eq!(
        exec(
            r#"a[m["next"][7](j)(m["next"][7])(m["next"])[7](i)(m["two"]) == 4]"#,
            &ns
        ),
        list(vec![Value::from("hello")])
    );
}

#[test]
fn test_missing_key_and_index() {
    let mut m = Map::new();
    m.insert(Key::from("one"), Value::Integer(1));
    let ns = Namespace::new()
        .with("m", Value::Map(m))
        .with("l", list(ints(&[1])));
    // parenthesised, so the brackets index instead of filtering
    assert!(matches!(eval_err(r#"(m["two"])"#, &ns), EvalError::Key(_)));
    assert_eq!(eval_err("(l[3])", &ns), EvalError::Index { index: 3, len: 1 });
    assert!(matches!(eval_err("l()", &ns), EvalError::NotCallable(_)));
}

// ============================================================================
// Host Objects and Output
// ============================================================================

#[derive(Debug)]
struct Temperature {
    celsius: f64,
}

impl flwor_lang::Object for Temperature {
    fn type_name(&self) -> &str {
        "Temperature"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "celsius" => Some(Value::Float(self.celsius)),
            "fahrenheit" => Some(Value::Float(self.celsius * 9.0 / 5.0 + 32.0)),
            _ => None,
        }
    }

    fn attr_names(&self) -> Vec<String> {
        vec!["celsius".to_string(), "fahrenheit".to_string()]
    }
}

#[test]
fn test_custom_object() {
    let readings: Vec<Value> = [10.0, 25.0, 40.0]
        .into_iter()
        .map(|celsius| Value::Object(std::sync::Arc::new(Temperature { celsius })))
        .collect();
    let station = Record::new("Station").with("readings", readings.clone());
    let ns = Namespace::with_builtins()
        .with("readings", readings)
        .with("station", station.into_value());

    let result = exec(
        r#"for t in readings where t.fahrenheit > 70 and isinstance(t, "Temperature") return t.celsius"#,
        &ns,
    );
    assert_eq!(result, list(vec![Value::Float(25.0), Value::Float(40.0)]));

    let first = exec("station/readings[self.celsius == 10.0]", &ns);
    assert_eq!(to_json(&first), r#"[{"celsius":10.0,"fahrenheit":50.0}]"#);
}

#[test]
fn test_queries_are_reusable_across_namespaces() {
    let query = compile("for x in xs where x % 2 == 0 return x").unwrap();
    let evens = query.call(&Namespace::new().with("xs", list(ints(&[1, 2, 3, 4])))).unwrap();
    let none = query.call(&Namespace::new().with("xs", list(ints(&[1, 3])))).unwrap();
    assert_eq!(evens, list(ints(&[2, 4])));
    assert_eq!(none, list(vec![]));
    assert_eq!(query.source(), "for x in xs where x % 2 == 0 return x");
}
