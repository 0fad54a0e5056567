//! FLWOR queries with XPath-like navigation over host values.
//!
//! A query is compiled once into a [`CompiledQuery`] and then called against
//! any number of [`Namespace`]s:
//!
//! ```
//! use flwor_lang::{compile, Namespace, Record, Value};
//!
//! let o = Record::new("O")
//!     .with("x", vec![
//!         Record::new("A").with("q", 5).into_value(),
//!         Record::new("A").with("q", 7).into_value(),
//!     ])
//!     .into_value();
//!
//! let query = compile("o/x[self.q > 5]").unwrap();
//! let result = query.call(&Namespace::new().with("o", o)).unwrap();
//! assert_eq!(result.iterate().unwrap().len(), 1);
//! ```
pub mod ast;
mod builtins;
pub mod cli;
pub mod compile;
pub mod evaluator;
mod flwor;
pub mod function;
pub mod lexer;
mod methods;
pub mod object;
pub mod output;
pub mod parser;
pub mod scope;
pub mod value;

pub use ast::{BinOp, Expr, Query, Token};
pub use compile::{CompiledQuery, Error, compile, compile_with, execute};
pub use evaluator::{EvalError, Evaluator, Options};
pub use function::{Closure, Function, NativeFunction};
pub use lexer::{LexError, Lexer, Position};
pub use object::{Object, Record};
pub use output::{to_json, to_json_pretty};
pub use parser::{Parser, SyntaxError};
pub use scope::{Namespace, Scope};
pub use value::{Key, Map, Value};
