use std::fmt;

use thiserror::Error;

use crate::ast::Token;

/// Location of a character in the query text.
///
/// `offset` counts characters from the start; `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token together with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub position: Position,
}

/// Input that matches no token pattern.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

pub struct Lexer {
    input: Vec<char>,
    position: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: Position::start(),
        }
    }

    /// Lexes the whole input, ending with a single [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let position = self.position;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(SpannedToken { token, position });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position.offset).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position.offset + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position.offset += 1;
            if ch == '\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else {
                self.position.column += 1;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: self.position,
        }
    }

    /// Skips whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('0') => result.push('\0'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            return Err(self.error(format!("Invalid escape sequence '\\{}'", ch)));
                        }
                        None => {
                            return Err(self.error("Unterminated string: unexpected end of input after backslash"));
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            message: "Unterminated string: missing closing quote".to_string(),
            position: start,
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = |kind: &str| LexError {
            message: format!("Invalid {} literal '{}'", kind, number),
            position: start,
        };
        if is_float {
            number.parse::<f64>().map(Token::Float).map_err(|_| invalid("float"))
        } else {
            number.parse::<i64>().map(Token::Integer).map_err(|_| invalid("integer"))
        }
    }

    /// Produces the next token, skipping whitespace and comments first.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                return Err(self.error("Numbers must have a digit before the decimal point"));
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                if self.peek_char(1) == Some('/') {
                    self.advance();
                    self.advance();
                    Token::DoubleSlash
                } else {
                    self.advance();
                    Token::Slash
                }
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::EqEq
                } else {
                    self.advance();
                    Token::Assign
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::NotEq
                } else {
                    return Err(self.error("Unexpected '!' (did you mean '!=' or 'not'?)"));
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::LtEq
                } else {
                    self.advance();
                    Token::Lt
                }
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some('{') => {
                self.advance();
                Token::LBrace
            }
            Some('}') => {
                self.advance();
                Token::RBrace
            }
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                Token::keyword(&ident).unwrap_or(Token::Identifier(ident))
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => return Err(self.error(format!("Unexpected character '{}'", ch))),
        };
        Ok(token)
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("for let where order by ascd desc return collect as with");
    assert_eq!(lexer.next_token().unwrap(), Token::For);
    assert_eq!(lexer.next_token().unwrap(), Token::Let);
    assert_eq!(lexer.next_token().unwrap(), Token::Where);
    assert_eq!(lexer.next_token().unwrap(), Token::Order);
    assert_eq!(lexer.next_token().unwrap(), Token::By);
    assert_eq!(lexer.next_token().unwrap(), Token::Ascd);
    assert_eq!(lexer.next_token().unwrap(), Token::Desc);
    assert_eq!(lexer.next_token().unwrap(), Token::Return);
    assert_eq!(lexer.next_token().unwrap(), Token::Collect);
    assert_eq!(lexer.next_token().unwrap(), Token::As);
    assert_eq!(lexer.next_token().unwrap(), Token::With);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_path_with_predicate() {
    let mut lexer = Lexer::new("o/x[self.q >= 5]");
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("o".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Slash);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("x".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::LBracket);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("self".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Dot);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("q".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::GtEq);
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(5));
    assert_eq!(lexer.next_token().unwrap(), Token::RBracket);
}
