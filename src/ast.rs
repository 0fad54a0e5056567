//! # FLWOR Query Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the query language:
//! a FLWOR (for/let/where/order by/return) dialect with XPath-like navigation
//! over the values of a caller-supplied namespace.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, names, paths, calls, functions)
//! - **[operators]** - Binary and unary operators
//! - **[clauses]** - FLWOR clauses (`for`, `let`, `where`, `order by`, `return`, `collect`)
//! - **[query]** - Top-level query forms
//!
//! ## Quick Start
//!
//! ```text
//! for x in o/x
//! where hasattr(x, "y")
//! return x.y.q
//! ```
//!
//! ## Core Concepts
//!
//! ### Path Navigation
//!
//! `a/b/c` starts from the value of `a` and replaces the current sequence by
//! the attribute of every candidate at each step. A list-valued attribute is
//! spliced in, one level per step. A predicate `[expr]` after a step keeps the
//! candidates for which `expr` is truthy, with `self` bound to the candidate.
//!
//! ### Scalar Wrap
//!
//! `<name>` yields a one-element list holding the bound value as is, so
//! `for _ in <l>` runs once even when `l` is a list.
//!
//! ### Blocks and Mappings
//!
//! `{` followed by `for`, `let` or `return` opens a nested FLWOR block whose
//! value is the block's result; any other `{` opens a mapping literal.
//!
//! ## Examples
//!
//! ### Predicate Filter
//!
//! ```text
//! a[self.q == 5]
//! ```
//!
//! ### Recursive Closure with Flatten
//!
//! ```text
//! for i in l
//! let f = function(l) {
//!   if (isinstance(l, "list")) then {for j in l return f(j)} else l
//! }
//! return flatten f(i)
//! ```
//!
//! ### Grouping
//!
//! ```text
//! for n in l
//! collect n as n with function(prev, next) {
//!   if prev == None then 1 else prev + 1
//! }
//! ```
pub mod clauses;
pub mod expressions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use clauses::{
    CollectClause, Direction, Flwor, ForClause, LetClause, OrderBy, ReturnClause, ReturnItems,
    Terminal,
};
pub use expressions::{Expr, Path, PathStep};
pub use operators::{BinOp, UnaryOp};
pub use query::Query;
pub use tokens::Token;
