//! Execute queries against JSON input

use log::debug;

use super::{CliError, json_to_namespace};
use crate::{Lexer, Namespace, Parser, compile, output};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query to execute
    pub query: String,
    /// JSON object whose members become the query's names
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Query executed successfully; holds the result as JSON text
    Success(String),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        let mut parser = Parser::new(Lexer::new(&options.query))?;
        parser.parse_query()?;
        return Ok(CheckResult::SyntaxValid);
    }

    let query = compile(&options.query)?;

    let namespace = match &options.input {
        Some(json_str) => json_to_namespace(serde_json::from_str(json_str)?)?,
        None => Namespace::with_builtins(),
    };
    debug!("namespace has {} name(s)", namespace.len());

    let result = query.call(&namespace)?;
    let json = if options.pretty {
        output::to_json_pretty(&result)
    } else {
        output::to_json(&result)
    };
    Ok(CheckResult::Success(json))
}
