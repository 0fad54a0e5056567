use crate::ast::Expr;

/// A FLWOR clause chain.
///
/// # Example
/// ```text
/// for x in f()
/// let y = f()
/// where x > 1
/// order by 0 desc
/// return x, y
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Flwor {
    /// Source iteration; without it the chain runs exactly once
    pub for_clause: Option<ForClause>,

    /// `let` bindings in declaration order
    pub lets: Vec<LetClause>,

    /// Optional filter over iterations
    pub where_clause: Option<Expr>,

    /// Optional sort of the per-iteration return tuples
    pub order_by: Option<OrderBy>,

    /// `return` or `collect`
    pub terminal: Terminal,
}

/// `for name in source`
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause {
    pub variable: String,
    pub source: Expr,
}

/// `let name = value`
#[derive(Debug, Clone, PartialEq)]
pub struct LetClause {
    pub name: String,
    pub value: Expr,
}

/// `order by index (ascd|desc)`
///
/// The index is validated against the return arity at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub index: usize,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// The clause that produces the FLWOR result.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Return(ReturnClause),
    /// One or more `collect` clauses sharing the same source pass
    Collect(Vec<CollectClause>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    /// `return flatten ...`
    pub flatten: bool,
    pub items: ReturnItems,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnItems {
    /// `return e1, e2`
    Positional(Vec<Expr>),
    /// `return "k1": e1, "k2": e2`, one mapping per iteration
    Named(Vec<(String, Expr)>),
}

impl ReturnItems {
    pub fn len(&self) -> usize {
        match self {
            ReturnItems::Positional(items) => items.len(),
            ReturnItems::Named(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `collect value as key with reducer`
#[derive(Debug, Clone, PartialEq)]
pub struct CollectClause {
    pub value: Expr,
    pub key: Expr,
    pub reducer: Expr,
}
