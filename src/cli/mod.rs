//! CLI support for flwor-lang
//!
//! Provides programmatic access to the `flwor` command's functionality for
//! embedding in other tools.

mod check;
mod convert;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{json_to_namespace, json_to_value};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Lex error: {0}")]
    Lex(#[from] crate::LexError),

    #[error("Syntax error: {0}")]
    Syntax(#[from] crate::SyntaxError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Input parsed, but is not a JSON object
    #[error("Input must be a JSON object mapping names to values, got {0}")]
    InputNotObject(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<crate::Error> for CliError {
    fn from(e: crate::Error) -> Self {
        match e {
            crate::Error::Lex(e) => CliError::Lex(e),
            crate::Error::Syntax(e) => CliError::Syntax(e),
            crate::Error::Eval(e) => CliError::Eval(e),
        }
    }
}
