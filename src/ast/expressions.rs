use std::sync::Arc;

use crate::ast::{BinOp, Flwor, UnaryOp};

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Nodes are immutable once built. Function bodies sit behind an [`Arc`] so
/// closures created at evaluation time share them instead of copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Literal floating point number
    Float(f64),

    /// Literal integer
    Integer(i64),

    /// String literal
    String(String),

    /// Boolean literal
    Boolean(bool),

    /// `None` literal
    None,

    // References
    /// Name resolved through the scope chain
    ///
    /// # Example
    /// ```text
    /// hello
    /// ```
    Name(String),

    /// Scalar wrap (`<name>`)
    ///
    /// Evaluates to a one-element list holding the raw bound value, so a list
    /// can be used as a single `for` source item.
    ScalarWrap(String),

    /// Path navigation with per-step flattening
    ///
    /// # Examples
    /// ```text
    /// o/x/y
    /// o/x[hasattr(self, "y")]/y/q
    /// ```
    Path(Path),

    // Access
    /// Attribute access, no flattening
    ///
    /// # Example
    /// ```text
    /// self.q
    /// ```
    Attribute { object: Box<Expr>, name: String },

    /// Index into a list, string or mapping
    ///
    /// # Examples
    /// ```text
    /// l[7][0]
    /// m["next"]
    /// ```
    Index { object: Box<Expr>, index: Box<Expr> },

    /// Call of any callable value
    ///
    /// # Examples
    /// ```text
    /// f()
    /// j(j)(j)(h)(i, 3)
    /// ```
    Call { callee: Box<Expr>, args: Vec<Expr> },

    // Operations
    /// Binary operation (arithmetic, comparison, membership, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation (`not`, `-`)
    UnaryOp { op: UnaryOp, operand: Box<Expr> },

    /// Conditional; only the selected branch is evaluated
    ///
    /// # Example
    /// ```text
    /// if (q) then 1 else 0
    /// ```
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    // Literals of composite values
    /// List literal (`[1, 2, 3]`)
    List(Vec<Expr>),

    /// Tuple literal (`(1, 2, 3)`, `()`)
    Tuple(Vec<Expr>),

    /// Mapping literal with evaluated keys (`{a: l}`)
    Map(Vec<(Expr, Expr)>),

    /// Function literal
    ///
    /// # Example
    /// ```text
    /// function(prev, next) { if prev == None then 1 else prev + 1 }
    /// ```
    Function {
        params: Arc<[String]>,
        body: Arc<Expr>,
    },

    /// Nested FLWOR block (`{ for j in l return f(j) }`)
    Block(Box<Flwor>),
}

/// A navigation path: a root name followed by attribute steps and predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Name whose value seeds the current sequence
    pub root: String,
    pub steps: Vec<PathStep>,
}

/// One element of a [`Path`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    /// Replace each candidate by its attribute, splicing list values in
    Attribute(String),
    /// Keep candidates for which the expression is truthy with `self` bound
    Predicate(Expr),
}

impl Path {
    pub fn new(root: impl Into<String>) -> Self {
        Path {
            root: root.into(),
            steps: Vec::new(),
        }
    }
}
