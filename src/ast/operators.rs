/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Membership
    /// Membership test (`in`)
    In,
    /// Negated membership test (`not in`)
    NotIn,

    // Arithmetic
    /// Addition, string or list concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// True division (`/`), always produces a float
    Divide,
    /// Floor division (`//`)
    FloorDivide,
    /// Modulo (`%`), result takes the sign of the divisor
    Modulo,

    // Logical
    /// Short-circuit AND (`and`)
    And,
    /// Short-circuit OR (`or`)
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation (`not`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
}
