//! Compiling query text into reusable [`CompiledQuery`] values.

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::{
    ast::Query,
    evaluator::{EvalError, Evaluator, Options},
    lexer::{LexError, Lexer},
    parser::{Parser, SyntaxError},
    scope::Namespace,
    value::Value,
};

/// Any failure between query text and result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// A parsed query, callable any number of times against different
/// namespaces, from any number of threads.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    query: Arc<Query>,
    source: Arc<str>,
    options: Options,
}

impl CompiledQuery {
    /// Evaluates the query against `namespace`.
    ///
    /// # Examples
    ///
    /// ```
    /// use flwor_lang::{compile, Namespace, Value};
    ///
    /// let query = compile("for x in <items> where x > 1 return x * 10").unwrap();
    /// let ns = Namespace::new().with("items", vec![Value::from(1), Value::from(2)]);
    /// assert_eq!(query.call(&ns).unwrap(), Value::List(vec![Value::from(20)]));
    /// ```
    pub fn call(&self, namespace: &Namespace) -> Result<Value, EvalError> {
        debug!("invoking query with {} name(s) bound", namespace.len());
        Evaluator::with_options(self.options).eval_query(&self.query, namespace.clone())
    }

    /// The text this query was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn options(&self) -> Options {
        self.options
    }
}

/// Compiles `text` with default [`Options`].
pub fn compile(text: &str) -> Result<CompiledQuery, Error> {
    compile_with(text, Options::default())
}

pub fn compile_with(text: &str, options: Options) -> Result<CompiledQuery, Error> {
    let mut parser = Parser::new(Lexer::new(text))?;
    let query = parser.parse_query()?;
    debug!("compiled {} query ({} chars)", query.kind(), text.chars().count());

    Ok(CompiledQuery {
        query: Arc::new(query),
        source: Arc::from(text),
        options,
    })
}

/// Compiles and runs `text` once.
pub fn execute(text: &str, namespace: &Namespace) -> Result<Value, Error> {
    Ok(compile(text)?.call(namespace)?)
}
