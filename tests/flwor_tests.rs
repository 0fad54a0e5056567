// tests/flwor_tests.rs

use flwor_lang::{
    EvalError, Key, Map, NativeFunction, Namespace, Options, Record, Value, compile, compile_with,
    execute,
};

fn exec(query: &str, ns: &Namespace) -> Value {
    execute(query, ns).unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e))
}

fn list(values: Vec<Value>) -> Value {
    Value::List(values)
}

fn ints(values: &[i64]) -> Value {
    list(values.iter().map(|n| Value::Integer(*n)).collect())
}

fn floats(values: &[f64]) -> Value {
    list(values.iter().map(|n| Value::Float(*n)).collect())
}

fn int_map(pairs: &[(i64, i64)]) -> Value {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert(Key::from(*k), Value::Integer(*v));
    }
    Value::Map(map)
}

fn empties(n: usize) -> Vec<Value> {
    vec![list(vec![]); n]
}

/// `[1..7, [1..7, [1..8]]]`
fn nested_list() -> Value {
    let inner = ints(&[1, 2, 3, 4, 5, 6, 7, 8]);
    let Value::List(mut middle) = ints(&[1, 2, 3, 4, 5, 6, 7]) else {
        unreachable!()
    };
    middle.push(inner);
    let Value::List(mut outer) = ints(&[1, 2, 3, 4, 5, 6, 7]) else {
        unreachable!()
    };
    outer.push(list(middle));
    list(outer)
}

fn base_ns() -> Namespace {
    Namespace::with_builtins()
        .with("a", "hello")
        .with("l", nested_list())
}

fn counts_ns() -> Namespace {
    Namespace::with_builtins().with("l", ints(&[1, 2, 3, 4, 5, 6, 7, 3, 4, 5, 6, 7, 3, 4]))
}

const FLAT: &[i64] = &[
    1, 2, 3, 4, 5, 6, 7, 1, 2, 3, 4, 5, 6, 7, 1, 2, 3, 4, 5, 6, 7, 8,
];

// ============================================================================
// Return
// ============================================================================

#[test]
fn test_flwr_attrvalue() {
    let ns = Namespace::new().with("f", NativeFunction::new("f", |_| Ok(ints(&[1, 2, 3]))));
    assert_eq!(exec("for x in f() return x", &ns), ints(&[1, 2, 3]));
    assert_eq!(
        exec("for x in f() let y = f() return x, y", &ns),
        list(vec![
            list(vec![Value::Integer(1), ints(&[1, 2, 3])]),
            list(vec![Value::Integer(2), ints(&[1, 2, 3])]),
            list(vec![Value::Integer(3), ints(&[1, 2, 3])]),
        ])
    );
}

#[test]
fn test_named_return() {
    let result = exec(
        r#"for x in [1, 2] return "v": x, "sq": x * x"#,
        &Namespace::new(),
    );
    let row = |v: i64, sq: i64| {
        let mut map = Map::new();
        map.insert(Key::from("v"), Value::Integer(v));
        map.insert(Key::from("sq"), Value::Integer(sq));
        Value::Map(map)
    };
    assert_eq!(result, list(vec![row(1, 1), row(2, 4)]));
}

#[test]
fn test_return_none() {
    assert_eq!(
        exec("for x in l return None", &base_ns()),
        list(vec![Value::None; 8])
    );
}

#[test]
fn test_construct_class() {
    let ns = Namespace::new()
        .with("q", Value::None)
        .with("A", NativeFunction::new("A", |_| Ok(Record::new("A").into_value())));
    let result = exec("for x in <q> return A()", &ns);
    assert!(result.is_truthy());
    assert_eq!(result.iterate().unwrap()[0].type_name(), "A");
}

#[test]
fn test_where_sees_lets() {
    let result = exec(
        "for x in [1, 2, 3, 4] let y = x * x where y > 4 return y",
        &Namespace::new(),
    );
    assert_eq!(result, ints(&[9, 16]));
}

#[test]
fn test_iterating_strings_and_mappings() {
    let ns = Namespace::new();
    assert_eq!(
        exec(r#"for c in "abc" return c.upper()"#, &ns),
        list(vec![Value::from("A"), Value::from("B"), Value::from("C")])
    );
    assert_eq!(
        exec("for k in {'x': 1, 'y': 2} return k", &ns),
        list(vec![Value::from("x"), Value::from("y")])
    );
}

#[test]
fn test_iterating_a_scalar_fails() {
    let err = compile("for x in 5 return x").unwrap().call(&Namespace::new()).unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
}

#[test]
fn test_errors_abort_the_query() {
    let err = compile("for x in [1, 0] return 1 / x")
        .unwrap()
        .call(&Namespace::new())
        .unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero);
}

// ============================================================================
// Order By
// ============================================================================

#[test]
fn test_flwr_orderby() {
    let ns = Namespace::new().with("f", NativeFunction::new("f", |_| Ok(ints(&[1, 3, 2]))));
    assert_eq!(exec("for x in f() order by 0 ascd return x", &ns), ints(&[1, 2, 3]));
    assert_eq!(exec("for x in f() order by 0 desc return x", &ns), ints(&[3, 2, 1]));
    assert!(matches!(
        execute(r#"for x in f() order by "asdf" ascd return x"#, &ns),
        Err(flwor_lang::Error::Syntax(_))
    ));
    assert!(matches!(
        execute(r#"for x in f() order by 0 ascd return "asdf":x"#, &ns),
        Err(flwor_lang::Error::Syntax(_))
    ));
}

#[test]
fn test_order_by_component() {
    let result = exec(
        "for x in ['b', 'c', 'a'] order by 1 return x, x.upper()",
        &Namespace::new(),
    );
    let row = |s: &str| list(vec![Value::from(s), Value::from(s.to_uppercase())]);
    assert_eq!(result, list(vec![row("a"), row("b"), row("c")]));
}

#[test]
fn test_order_by_is_stable() {
    let result = exec(
        "for p in [[1, 'x'], [0, 'y'], [1, 'z']] order by 0 desc return p[0], p[1]",
        &Namespace::new(),
    );
    let labels: Vec<Value> = result
        .iterate()
        .unwrap()
        .iter()
        .map(|row| row.index(&Value::Integer(1)).unwrap())
        .collect();
    assert_eq!(
        labels,
        vec![Value::from("x"), Value::from("z"), Value::from("y")]
    );
}

#[test]
fn test_order_by_incomparable_values_fails() {
    let err = compile("for x in [1, 'a'] order by 0 return x")
        .unwrap()
        .call(&Namespace::new())
        .unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
}

// ============================================================================
// Functions and Closures
// ============================================================================

#[test]
fn test_function_def() {
    let ns = base_ns();
    assert_eq!(
        exec(
            "
          for i in l
          let f = function() { 125 }
          return f()
        ",
            &ns
        ),
        ints(&[125; 8])
    );

    let deepest = list(vec![list(empties(8))]);
    let mut middle = empties(7);
    middle.push(deepest);
    let mut expected = empties(7);
    expected.push(list(vec![list(middle)]));

    assert_eq!(
        exec(
            r#"
          for i in l
            let f = function(q) {
              for _ in <a>
              where isinstance(q, "list")
              return {
                for j in q
                return f(j)
              }
            }
          return f(i)
        "#,
            &ns
        ),
        list(expected)
    );
}

#[test]
fn test_closure_captures_let_scope() {
    let result = exec(
        "for x in [1, 2] let k = x * 10 let add = function(y) { y + k } return add(1)",
        &Namespace::new(),
    );
    assert_eq!(result, ints(&[11, 21]));
}

#[test]
fn test_anonymous_function_passed_to_builtin() {
    let result = exec(
        "return sorted(['bb', 'a', 'ccc'], function(s) { 0 - len(s) })",
        &Namespace::with_builtins(),
    );
    assert_eq!(
        result,
        list(vec![list(vec![
            Value::from("ccc"),
            Value::from("bb"),
            Value::from("a")
        ])])
    );
}

#[test]
fn test_wrong_arity() {
    let err = compile("let f = function(a, b) { a } return f(1)")
        .unwrap()
        .call(&Namespace::new())
        .unwrap_err();
    assert_eq!(
        err,
        EvalError::Arity {
            function: "f".to_string(),
            expected: 2,
            got: 1
        }
    );
}

#[test]
fn test_recursion_limit() {
    let options = Options { max_call_depth: 16 };
    let query = compile_with("let f = function(n) { f(n + 1) } return f(0)", options).unwrap();
    assert_eq!(
        query.call(&Namespace::new()).unwrap_err(),
        EvalError::RecursionLimit(16)
    );

    // bounded recursion below the limit succeeds, and the depth is released
    let query = compile_with(
        "let fact = function(n) { if n <= 1 then 1 else n * fact(n - 1) } return fact(10)",
        options,
    )
    .unwrap();
    assert_eq!(query.call(&Namespace::new()).unwrap(), ints(&[3628800]));
    assert_eq!(query.call(&Namespace::new()).unwrap(), ints(&[3628800]));
}

/// Runs `f` on a thread with the default 2 MiB spawned-thread stack.
fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_default_depth_fits_small_stack() {
    let limit = Options::default().max_call_depth as i64;

    let countdown = "let f = function(n) { if n == 0 then 0 else 1 + f(n - 1) } return f(depth)";
    let through_blocks = r#"
        let f = function(n) {
          if n == 0 then 0 else 1 + {for m in [n - 1] return f(m)}[0]
        }
        return f(depth)
    "#;

    for text in [countdown, through_blocks] {
        let query = compile(text).unwrap();
        let (deepest, past_limit) = on_small_stack(move || {
            let deepest = query.call(&Namespace::with_builtins().with("depth", limit - 1));
            let past_limit = query.call(&Namespace::with_builtins().with("depth", limit));
            (deepest, past_limit)
        });
        assert_eq!(deepest.unwrap(), ints(&[limit - 1]));
        assert_eq!(past_limit.unwrap_err(), EvalError::RecursionLimit(limit as usize));
    }
}

#[test]
fn test_runaway_recursion_on_small_stack() {
    let query = compile("let f = function(n) { f(n + 1) } return f(0)").unwrap();
    let result = on_small_stack(move || query.call(&Namespace::new()));
    assert_eq!(
        result.unwrap_err(),
        EvalError::RecursionLimit(Options::default().max_call_depth)
    );
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_if_expr() {
    let ns = base_ns().with("q", true);
    assert_eq!(
        exec("for x in <a> return if (q) then 1 else 0", &ns),
        ints(&[1])
    );
    assert_eq!(
        exec("for x in [1, 5] return if x > 2 then 'big' else 'small'", &ns),
        list(vec![Value::from("small"), Value::from("big")])
    );
}

#[test]
fn test_if_expr_short_circuit() {
    let ns = base_ns();
    assert_eq!(
        exec("for x in <a> return if (true or X) then 1 else 0", &ns),
        ints(&[1])
    );
    assert_eq!(
        exec("for x in <a> return if (false and false.x) then 1 else 0", &ns),
        ints(&[0])
    );
    // only the taken branch is evaluated
    assert_eq!(
        exec("for x in <a> return if (true) then 1 else undefined_name", &ns),
        ints(&[1])
    );
}

// ============================================================================
// Flatten and No-For
// ============================================================================

#[test]
fn test_flattened_return() {
    let ns = base_ns();
    assert_eq!(
        exec(
            r#"
            for i in l
            let f = function(l) {
              if (isinstance(l, "list"))
              then {for j in l return f(j)}
              else l
            }
            return flatten f(i)
          "#,
            &ns
        ),
        ints(FLAT)
    );

    let expected: Vec<Value> = FLAT
        .iter()
        .map(|n| {
            let mut map = Map::new();
            map.insert(Key::from("hello"), Value::Integer(*n));
            Value::Map(map)
        })
        .collect();
    assert_eq!(
        exec(
            r#"
            for i in l
            let f = function(l) {
              if (isinstance(l, "list"))
              then {for j in l return f(j)}
              else {a:l}
            }
            return flatten f(i)
          "#,
            &ns
        ),
        list(expected)
    );
}

#[test]
fn test_no_for() {
    let ns = base_ns();
    assert_eq!(exec("return <a>", &ns), list(vec![list(vec![Value::from("hello")])]));
    assert_eq!(exec("return l", &ns), list(vec![nested_list()]));
    assert_eq!(
        exec(
            r#"
            let f = function(l) {
              if (isinstance(l, "list"))
              then {for j in l return f(j)}
              else l
            }
            return flatten f(l)
          "#,
            &ns
        ),
        ints(FLAT)
    );
}

// ============================================================================
// Collect
// ============================================================================

#[test]
fn test_count() {
    assert_eq!(
        exec(
            "
            for n in l
            collect n as n with function(prev, next) {
                if prev == None then 1 else prev + 1
            }
          ",
            &counts_ns()
        ),
        int_map(&[(1, 1), (2, 1), (3, 3), (4, 3), (5, 2), (6, 2), (7, 2)])
    );
}

#[test]
fn test_list_literal() {
    assert_eq!(
        exec(
            "
            for n in [1,2,3,4,5,6,7,3,4,5,6,7,3,4]
            collect n as n with function(prev, next) {
                if prev == None then 1 else prev + 1
            }
          ",
            &Namespace::new()
        ),
        int_map(&[(1, 1), (2, 1), (3, 3), (4, 3), (5, 2), (6, 2), (7, 2)])
    );
}

#[test]
fn test_innotin() {
    assert_eq!(
        exec(
            "
            for n in l
            where 1 in l and 12 not in l
            collect n as n with function(prev, next) {
                if prev == None then 1 else prev + 1
            }
          ",
            &counts_ns()
        ),
        int_map(&[(1, 1), (2, 1), (3, 3), (4, 3), (5, 2), (6, 2), (7, 2)])
    );
}

#[test]
fn test_multi_collect() {
    assert_eq!(
        exec(
            "
            for n in l
            let counter = function(prev, next) {
                if prev == None then 1 else prev + 1
            }
            where 1 in l and 12 not in l
            collect n as n with counter
            collect n as (int(n)//int(2)) with counter
          ",
            &counts_ns()
        ),
        list(vec![
            int_map(&[(1, 1), (2, 1), (3, 3), (4, 3), (5, 2), (6, 2), (7, 2)]),
            int_map(&[(0, 1), (1, 4), (2, 5), (3, 4)]),
        ])
    );
}

#[test]
fn test_collect_sum_by_key() {
    let result = exec(
        "
        for w in ['apple', 'avocado', 'banana']
        collect len(w) as w[0] with function(prev, n) { if prev == None then n else prev + n }
        ",
        &Namespace::with_builtins(),
    );
    let mut expected = Map::new();
    expected.insert(Key::from("a"), Value::Integer(12));
    expected.insert(Key::from("b"), Value::Integer(6));
    assert_eq!(result, Value::Map(expected));
}

#[test]
fn test_collect_with_unhashable_key_fails() {
    let err = compile("for n in [1] collect n as {} with function(p, n) { n }")
        .unwrap()
        .call(&Namespace::new())
        .unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
}

#[test]
fn test_collect_with_no_rows_is_empty() {
    assert_eq!(
        exec("for n in [] collect n as n with f", &Namespace::new()),
        Value::Map(Map::new())
    );
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_arithmetic() {
    assert_eq!(
        exec(
            "
            for n in [
                4.0*3.0/2.0,
                4.0/3.0*2.0,
                (3.0+9.0)*4.0/8.0,
                ((9.0-3.0)+(5.0-3.0))/2.0 + 2.0,
                5.0 * 4.0 / 2.0 - 10.0 + 5.0 - 2.0 + 3.0,
                5.0 / 4.0 * 2.0 + 10.0 - 5.0 * 2.0 / 3.0
            ]
            return n
          ",
            &Namespace::new()
        ),
        floats(&[
            4.0 * 3.0 / 2.0,
            4.0 / 3.0 * 2.0,
            (3.0 + 9.0) * 4.0 / 8.0,
            ((9.0 - 3.0) + (5.0 - 3.0)) / 2.0 + 2.0,
            5.0 * 4.0 / 2.0 - 10.0 + 5.0 - 2.0 + 3.0,
            5.0 / 4.0 * 2.0 + 10.0 - 5.0 * 2.0 / 3.0,
        ])
    );
}

#[test]
fn test_integer_division_forms() {
    let ns = Namespace::new();
    assert_eq!(exec("7 / 2", &ns), floats(&[3.5]));
    assert_eq!(exec("7 // 2", &ns), ints(&[3]));
    assert_eq!(exec("-7 // 2", &ns), ints(&[-4]));
    assert_eq!(exec("-7 % 3", &ns), ints(&[2]));
}

#[test]
fn test_oversized_repetition_is_an_error() {
    let ns = Namespace::new();
    for text in ["[1, 2] * 9223372036854775807", "'ab' * 9223372036854775807"] {
        assert_eq!(
            execute(text, &ns).unwrap_err(),
            flwor_lang::Error::Eval(EvalError::Overflow)
        );
    }
    assert_eq!(exec("[1] * 3", &ns), list(vec![ints(&[1, 1, 1])]));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_invocations() {
    let query = compile(
        "for n in l let sq = function(x) { x * x } where n % 2 == 0 return sq(n)",
    )
    .unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (1..=4i64)
            .map(|k| {
                let query = &query;
                s.spawn(move || {
                    let ns = Namespace::new().with("l", ints(&[k, 2 * k, 3 * k, 4 * k]));
                    (k, query.call(&ns).unwrap())
                })
            })
            .collect();

        for handle in handles {
            let (k, result) = handle.join().unwrap();
            let expected: Vec<i64> = [k, 2 * k, 3 * k, 4 * k]
                .into_iter()
                .filter(|n| n % 2 == 0)
                .map(|n| n * n)
                .collect();
            assert_eq!(result, ints(&expected));
        }
    });
}

#[test]
fn test_compiled_query_clones_share_source() {
    let query = compile("return 1 + 1").unwrap();
    let copy = query.clone();
    assert_eq!(copy.source(), query.source());
    assert_eq!(copy.call(&Namespace::new()).unwrap(), ints(&[2]));
}
