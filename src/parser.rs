use std::mem;
use std::sync::Arc;

use thiserror::Error;

use crate::{
    ast::{
        BinOp, CollectClause, Direction, Expr, Flwor, ForClause, LetClause, OrderBy, Path,
        PathStep, Query, ReturnClause, ReturnItems, Terminal, Token, UnaryOp,
    },
    lexer::{LexError, Lexer, Position, SpannedToken},
};

/// Grammar violation found while parsing, including the static clause rules.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {position}")]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

const EOF: &Token = &Token::Eof;

/// Nesting limit for expressions, so deep input fails before the stack does.
pub const MAX_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<SpannedToken>,
    index: usize,
    depth: usize,
}

impl Parser {
    /// Lexes the whole input up front.
    pub fn new(lexer: Lexer) -> Result<Self, LexError> {
        Ok(Parser {
            tokens: lexer.tokenize()?,
            index: 0,
            depth: 0,
        })
    }

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.index + offset)
            .map(|t| &t.token)
            .unwrap_or(EOF)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.index)
            .or(self.tokens.last())
            .map(|t| t.position)
            .unwrap_or_default()
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Returns the current token and moves past it.
    fn take(&mut self) -> Token {
        let token = self.current().clone();
        self.advance();
        token
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(self.current()) == mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if !self.check(&expected) {
            return Err(self.error(format!("Expected '{}', found '{}'", expected, self.current())));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, SyntaxError> {
        match self.current() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier {}, found '{}'", context, other))),
        }
    }

    fn enter_recursion(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            position: self.position(),
        }
    }

    fn starts_flwor(&self) -> bool {
        matches!(self.current(), Token::For | Token::Let | Token::Return)
    }

    /// Parse primary expressions (atoms): literals, names, scalar wraps,
    /// parenthesised and tuple forms, list/mapping literals, blocks,
    /// function literals and conditionals.
    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let expr = match self.current() {
            Token::Float(n) => {
                let n = *n;
                self.advance();
                Expr::Float(n)
            }
            Token::Integer(n) => {
                let n = *n;
                self.advance();
                Expr::Integer(n)
            }
            Token::String(_) | Token::Identifier(_) => match self.take() {
                Token::String(s) => Expr::String(s),
                Token::Identifier(name) => Expr::Name(name),
                _ => unreachable!(),
            },
            Token::Boolean(b) => {
                let b = *b;
                self.advance();
                Expr::Boolean(b)
            }
            Token::None => {
                self.advance();
                Expr::None
            }
            // <name>
            Token::Lt => {
                self.advance();
                let name = self.expect_identifier("in scalar wrap '<name>'")?;
                self.expect(Token::Gt)?;
                Expr::ScalarWrap(name)
            }
            Token::LParen => {
                self.advance();
                self.parse_parenthesized()?
            }
            Token::LBracket => {
                self.advance();
                Expr::List(self.parse_expression_list(Token::RBracket)?)
            }
            Token::LBrace => {
                self.advance();
                if self.starts_flwor() {
                    let flwor = self.parse_flwor()?;
                    self.expect(Token::RBrace)?;
                    Expr::Block(Box::new(flwor))
                } else {
                    self.parse_map_literal()?
                }
            }
            Token::Function => self.parse_function()?,
            Token::If => self.parse_if()?,
            token => {
                return Err(self.error(format!("Unexpected '{}' in expression", token)));
            }
        };
        Ok(expr)
    }

    /// After '(' : grouping, empty tuple, or tuple literal.
    fn parse_parenthesized(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(&Token::RParen) {
            self.advance();
            return Ok(Expr::Tuple(vec![]));
        }

        let first = self.parse_expression()?;
        if !self.check(&Token::Comma) {
            self.expect(Token::RParen)?;
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.check(&Token::Comma) {
            self.advance();
            if self.check(&Token::RParen) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        self.expect(Token::RParen)?;
        Ok(Expr::Tuple(elements))
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn parse_expression_list(&mut self, close: Token) -> Result<Vec<Expr>, SyntaxError> {
        let mut elements = vec![];

        while !self.check(&close) {
            elements.push(self.parse_expression()?);

            if !self.check(&close) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(close)?;
        Ok(elements)
    }

    fn parse_map_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut pairs = vec![];

        while !self.check(&Token::RBrace) {
            let key = self.parse_expression()?;
            self.expect(Token::Colon)?;
            let value = self.parse_expression()?;
            pairs.push((key, value));

            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(Expr::Map(pairs))
    }

    /// `function(p1, ..., pn) { body }`, where the body is an expression or a
    /// FLWOR chain.
    fn parse_function(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(Token::Function)?;
        self.expect(Token::LParen)?;

        let mut params: Vec<String> = vec![];
        while !self.check(&Token::RParen) {
            let name = self.expect_identifier("as function parameter")?;
            if params.contains(&name) {
                return Err(self.error(format!("Duplicate parameter '{}'", name)));
            }
            params.push(name);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;

        self.expect(Token::LBrace)?;
        let body = if self.starts_flwor() {
            Expr::Block(Box::new(self.parse_flwor()?))
        } else {
            self.parse_expression()?
        };
        self.expect(Token::RBrace)?;

        Ok(Expr::Function {
            params: Arc::from(params),
            body: Arc::new(body),
        })
    }

    /// `if c then a else b`; the condition is usually parenthesised.
    fn parse_if(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(Token::If)?;
        let condition = self.parse_expression()?;
        self.expect(Token::Then)?;
        let then_branch = self.parse_expression()?;
        self.expect(Token::Else)?;
        let else_branch = self.parse_expression()?;

        Ok(Expr::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// Parse postfix forms: attribute access, calls, indexes, path steps and
    /// their predicates.
    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_identifier("after '.'")?;
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                Token::LParen => {
                    self.advance();
                    let args = self.parse_expression_list(Token::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let inner = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    expr = match expr {
                        Expr::Path(mut path) => {
                            path.steps.push(PathStep::Predicate(inner));
                            Expr::Path(path)
                        }
                        object => Expr::Index {
                            object: Box::new(object),
                            index: Box::new(inner),
                        },
                    };
                }
                // `/` between two names is a path step, otherwise division
                Token::Slash
                    if matches!(expr, Expr::Name(_) | Expr::Path(_))
                        && matches!(self.peek(1), Token::Identifier(_)) =>
                {
                    self.advance();
                    let name = self.expect_identifier("after '/'")?;
                    let mut path = match expr {
                        Expr::Path(path) => path,
                        Expr::Name(root) => Path::new(root),
                        _ => unreachable!(),
                    };
                    path.steps.push(PathStep::Attribute(name));
                    expr = Expr::Path(path);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.current() {
            Token::Not => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();

        self.enter_recursion()?;
        let operand = self.parse_unary();
        self.exit_recursion();

        Ok(match (op, operand?) {
            (UnaryOp::Negate, Expr::Integer(n)) => Expr::Integer(-n),
            (UnaryOp::Negate, Expr::Float(n)) => Expr::Float(-n),
            (op, operand) => Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current() {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::DoubleSlash => BinOp::FloorDivide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_additive()?;

        if let Some(op) = match self.current() {
            Token::EqEq => Some(BinOp::Equal),
            Token::NotEq => Some(BinOp::NotEqual),
            Token::Lt => Some(BinOp::LessThan),
            Token::Gt => Some(BinOp::GreaterThan),
            Token::LtEq => Some(BinOp::LessEqual),
            Token::GtEq => Some(BinOp::GreaterEqual),
            _ => None,
        } {
            self.advance();
            let right = self.parse_additive()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// `in` / `not in`
    fn parse_membership(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_comparison()?;

        loop {
            let op = if self.check(&Token::In) {
                self.advance();
                BinOp::In
            } else if self.check(&Token::Not) && matches!(self.peek(1), Token::In) {
                self.advance();
                self.advance();
                BinOp::NotIn
            } else {
                break;
            };
            let right = self.parse_comparison()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_membership()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_membership()?;

            left = Expr::BinaryOp {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;

            left = Expr::BinaryOp {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.enter_recursion()?;
        let expr = self.parse_or();
        self.exit_recursion();
        expr
    }

    /// Parse a standalone expression spanning the whole input.
    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }
}

impl Parser {
    /// Parse a complete query: a FLWOR chain, a path query, or a bare
    /// expression.
    pub fn parse_query(&mut self) -> Result<Query, SyntaxError> {
        if self.starts_flwor() {
            let flwor = self.parse_flwor()?;
            self.expect(Token::Eof)?;
            return Ok(Query::Flwor(flwor));
        }

        // A path spanning the whole input takes predicates on every step;
        // anything else is re-read as an expression.
        if matches!(self.current(), Token::Identifier(_)) {
            let start = self.index;
            if let Ok(path) = self.parse_path_query()
                && self.check(&Token::Eof)
            {
                return Ok(Query::Path(path));
            }
            self.index = start;
        }

        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(Query::Expression(expr))
    }

    fn parse_path_query(&mut self) -> Result<Path, SyntaxError> {
        let mut path = Path::new(self.expect_identifier("at start of path")?);

        loop {
            match self.current() {
                Token::LBracket => {
                    self.advance();
                    let predicate = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    path.steps.push(PathStep::Predicate(predicate));
                }
                Token::Slash => {
                    self.advance();
                    let name = self.expect_identifier("after '/'")?;
                    path.steps.push(PathStep::Attribute(name));
                }
                _ => break,
            }
        }
        Ok(path)
    }

    fn parse_flwor(&mut self) -> Result<Flwor, SyntaxError> {
        let for_clause = if self.check(&Token::For) {
            self.advance();
            let variable = self.expect_identifier("after 'for'")?;
            self.expect(Token::In)?;
            let source = self.parse_expression()?;
            Some(ForClause { variable, source })
        } else {
            None
        };

        let mut lets = vec![];
        while self.check(&Token::Let) {
            self.advance();
            let name = self.expect_identifier("after 'let'")?;
            self.expect(Token::Assign)?;
            let value = self.parse_expression()?;
            lets.push(LetClause { name, value });
        }

        let where_clause = if self.check(&Token::Where) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        let order_by = if self.check(&Token::Order) {
            let position = self.position();
            Some((self.parse_order_by()?, position))
        } else {
            None
        };

        let terminal = match self.current() {
            Token::Return => Terminal::Return(self.parse_return()?),
            Token::Collect => {
                if for_clause.is_none() {
                    return Err(self.error("'collect' requires a 'for' clause"));
                }
                Terminal::Collect(self.parse_collects()?)
            }
            other => {
                return Err(self.error(format!("Expected 'return' or 'collect', found '{}'", other)));
            }
        };

        match (self.current(), &terminal) {
            (Token::Collect, Terminal::Return(_)) => {
                return Err(self.error("'collect' cannot be combined with 'return'"));
            }
            (Token::Return, Terminal::Collect(_)) => {
                return Err(self.error("'return' cannot be combined with 'collect'"));
            }
            _ => {}
        }

        if let Some((order, position)) = &order_by {
            validate_order_by(order, &terminal).map_err(|message| SyntaxError {
                message,
                position: *position,
            })?;
        }

        Ok(Flwor {
            for_clause,
            lets,
            where_clause,
            order_by: order_by.map(|(order, _)| order),
            terminal,
        })
    }

    /// `order by <int-literal> (ascd|desc)?`
    fn parse_order_by(&mut self) -> Result<OrderBy, SyntaxError> {
        self.expect(Token::Order)?;
        self.expect(Token::By)?;

        let index = match self.current() {
            Token::Integer(n) if *n >= 0 => *n as usize,
            other => {
                return Err(self.error(format!(
                    "'order by' key must be a non-negative integer literal, found '{}'",
                    other
                )));
            }
        };
        self.advance();

        let direction = match self.current() {
            Token::Ascd => {
                self.advance();
                Direction::Ascending
            }
            Token::Desc => {
                self.advance();
                Direction::Descending
            }
            _ => Direction::default(),
        };

        Ok(OrderBy { index, direction })
    }

    fn parse_return(&mut self) -> Result<ReturnClause, SyntaxError> {
        self.expect(Token::Return)?;

        let flatten = if self.check(&Token::Flatten) {
            self.advance();
            true
        } else {
            false
        };

        let named = matches!(self.current(), Token::String(_)) && matches!(self.peek(1), Token::Colon);
        let items = if named {
            let mut items = vec![];
            loop {
                let name = match self.take() {
                    Token::String(name) => name,
                    other => {
                        return Err(self.error(format!(
                            "Cannot mix named and positional return items (found '{}')",
                            other
                        )));
                    }
                };
                self.expect(Token::Colon)?;
                items.push((name, self.parse_expression()?));
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
            ReturnItems::Named(items)
        } else {
            let mut items = vec![self.parse_expression()?];
            while self.check(&Token::Comma) {
                self.advance();
                items.push(self.parse_expression()?);
            }
            if self.check(&Token::Colon) {
                return Err(self.error("Cannot mix named and positional return items"));
            }
            ReturnItems::Positional(items)
        };

        if flatten && named {
            return Err(self.error("'flatten' cannot be applied to a named return"));
        }

        Ok(ReturnClause { flatten, items })
    }

    /// One or more `collect X as K with F` clauses.
    fn parse_collects(&mut self) -> Result<Vec<CollectClause>, SyntaxError> {
        let mut clauses = vec![];

        while self.check(&Token::Collect) {
            self.advance();
            let value = self.parse_expression()?;
            self.expect(Token::As)?;
            let key = self.parse_expression()?;
            self.expect(Token::With)?;
            let reducer = self.parse_expression()?;
            clauses.push(CollectClause {
                value,
                key,
                reducer,
            });
        }
        Ok(clauses)
    }
}

/// Static rules tying `order by` to the terminal clause.
fn validate_order_by(order: &OrderBy, terminal: &Terminal) -> Result<(), String> {
    match terminal {
        Terminal::Collect(_) => Err("'order by' cannot be combined with 'collect'".to_string()),
        Terminal::Return(ReturnClause {
            items: ReturnItems::Named(_),
            ..
        }) => Err("'order by' requires a positional return".to_string()),
        Terminal::Return(ReturnClause {
            items: ReturnItems::Positional(items),
            ..
        }) if order.index >= items.len() => Err(format!(
            "'order by' key {} is out of range for {} return item(s)",
            order.index,
            items.len()
        )),
        Terminal::Return(_) => Ok(()),
    }
}
