use std::fmt;

/// Lexical tokens produced by the [`Lexer`](crate::lexer::Lexer).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating point number
    ///
    /// # Examples
    /// ```text
    /// 2.2
    /// 4.0
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 0
    /// 125
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'y'
    /// ```
    String(String),

    /// Boolean values (`true`, `false`, `True`, `False`)
    Boolean(bool),

    /// The absent value (`None` or `null`)
    None,

    /// Name of a namespace entry, binding, attribute or parameter
    ///
    /// Must start with a letter or underscore, followed by letters, digits,
    /// or underscores.
    Identifier(String),

    // Keywords
    For,
    Let,
    Where,
    Order,
    By,
    /// Ascending sort direction (`ascd`)
    Ascd,
    /// Descending sort direction (`desc`)
    Desc,
    Return,
    Collect,
    As,
    With,
    Function,
    If,
    Then,
    Else,
    /// Deep-flatten modifier of a `return` clause
    Flatten,
    And,
    Or,
    Not,
    In,

    // Comparison
    /// Equality operator
    EqEq,
    /// Inequality operator
    NotEq,
    /// Less than, also the opening delimiter of a scalar wrap `<name>`
    Lt,
    /// Greater than, also the closing delimiter of a scalar wrap `<name>`
    Gt,
    /// Less than or equal
    LtEq,
    /// Greater than or equal
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    Star,
    /// Division, or a path step separator between two names (`o/x/y`)
    Slash,
    /// Floor division (`//`)
    DoubleSlash,
    Percent,

    /// Binding operator of a `let` clause
    Assign,

    // Delimiters
    /// Left bracket for predicates, indexes and list literals
    LBracket,
    RBracket,
    /// Left parenthesis for grouping, tuples and calls
    LParen,
    RParen,
    /// Left brace for mapping literals, blocks and function bodies
    LBrace,
    RBrace,
    /// Dot for attribute access
    Dot,
    Comma,
    Colon,

    /// End of input
    Eof,
}

impl Token {
    /// Maps a word to its keyword or literal token, if it is reserved.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "for" => Token::For,
            "let" => Token::Let,
            "where" => Token::Where,
            "order" => Token::Order,
            "by" => Token::By,
            "ascd" => Token::Ascd,
            "desc" => Token::Desc,
            "return" => Token::Return,
            "collect" => Token::Collect,
            "as" => Token::As,
            "with" => Token::With,
            "function" => Token::Function,
            "if" => Token::If,
            "then" => Token::Then,
            "else" => Token::Else,
            "flatten" => Token::Flatten,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "true" | "True" => Token::Boolean(true),
            "false" | "False" => Token::Boolean(false),
            "None" | "null" => Token::None,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Float(n) => write!(f, "{}", n),
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::None => write!(f, "None"),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::For => write!(f, "for"),
            Token::Let => write!(f, "let"),
            Token::Where => write!(f, "where"),
            Token::Order => write!(f, "order"),
            Token::By => write!(f, "by"),
            Token::Ascd => write!(f, "ascd"),
            Token::Desc => write!(f, "desc"),
            Token::Return => write!(f, "return"),
            Token::Collect => write!(f, "collect"),
            Token::As => write!(f, "as"),
            Token::With => write!(f, "with"),
            Token::Function => write!(f, "function"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::Flatten => write!(f, "flatten"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::In => write!(f, "in"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::DoubleSlash => write!(f, "//"),
            Token::Percent => write!(f, "%"),
            Token::Assign => write!(f, "="),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
