use crate::ast::{Expr, Flwor, Path};

/// A complete parsed query.
///
/// Every form evaluates to a list, except `collect` chains which produce a
/// mapping (or a tuple of mappings).
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Top-level path query; brackets on every step are predicates
    Path(Path),

    /// Any other bare expression, wrapped into a one-element list
    Expression(Expr),

    /// FLWOR clause chain
    Flwor(Flwor),
}

impl Query {
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Path(_) => "path",
            Query::Expression(_) => "expression",
            Query::Flwor(_) => "FLWOR",
        }
    }
}
