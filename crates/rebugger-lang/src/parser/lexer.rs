//! Lexer Implementation for Rebugger scripts
//!
//! Converts source strings into tokens while preserving byte spans and
//! line/column locations. Newlines are significant (they terminate
//! statements) and are emitted as tokens; the parser decides where they
//! may be skipped.

use crate::ast::Span;
use crate::error::{ParseError, ParseResult, SourceLocation};

//-----------------------------------------------------------------------------
// Token Definition
//-----------------------------------------------------------------------------

/// Token types for the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    /// Identifier or keyword
    Ident(String),
    /// `@name`
    Macro(String),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    Ellipsis,
    Colon,
    DoubleColon,
    Subtype,
    Assign,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,

    Newline,
    Eof,
}

impl Token {
    /// Format token for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Int(n) => format!("integer {}", n),
            Token::Float(x) => format!("float {}", x),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Ident(s) => format!("'{}'", s),
            Token::Macro(s) => format!("'@{}'", s),
            Token::Newline => "newline".to_string(),
            Token::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s == word)
    }
}

/// A token with its source position
#[derive(Debug, Clone)]
pub struct PositionedToken {
    pub token: Token,
    pub span: Span,
    pub location: SourceLocation,
}

//-----------------------------------------------------------------------------
// Lexer Implementation
//-----------------------------------------------------------------------------

/// Lexer for tokenizing script source
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next character
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0, line: 1, column: 1 }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Skip spaces, tabs and `#` comments, but not newlines
    fn skip_blank(&mut self) {
        while let Some(c) = self.peek() {
            if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if c.is_whitespace() && c != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> ParseResult<Token> {
        let start = self.current_location();
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError::unexpected_eof("closing quote", start.line, start.column));
                }
                Some('"') => break,
                Some('\\') => {
                    let loc = self.current_location();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('0') => value.push('\0'),
                        Some(other) => {
                            return Err(ParseError::lexical_error(
                                format!("invalid escape sequence '\\{}'", other),
                                loc.line,
                                loc.column,
                            ));
                        }
                        None => {
                            return Err(ParseError::unexpected_eof("escape character", loc.line, loc.column));
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }
        Ok(Token::Str(value))
    }

    fn read_number(&mut self) -> ParseResult<Token> {
        let start_loc = self.current_location();
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else if c == '.' && !is_float && self.peek_second().is_some_and(|d| d.is_ascii_digit()) {
                is_float = true;
                self.advance();
            } else if (c == 'e' || c == 'E')
                && self.peek_second().is_some_and(|d| d.is_ascii_digit() || d == '-' || d == '+')
            {
                is_float = true;
                self.advance();
                if let Some('-' | '+') = self.peek() {
                    self.advance();
                }
            } else {
                break;
            }
        }
        let text: String = self.input[start..self.pos].chars().filter(|c| *c != '_').collect();
        if is_float {
            text.parse::<f64>().map(Token::Float).map_err(|_| {
                ParseError::lexical_error(format!("invalid number format '{}'", text), start_loc.line, start_loc.column)
            })
        } else {
            text.parse::<i64>().map(Token::Int).map_err(|_| {
                ParseError::lexical_error(
                    format!("integer value out of range: {}", text),
                    start_loc.line,
                    start_loc.column,
                )
            })
        }
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else if c == '!' && self.peek_second() != Some('=') {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Consume `second` if it follows, returning `long`, otherwise `short`
    fn pick(&mut self, second: char, long: Token, short: Token) -> Token {
        if self.peek() == Some(second) {
            self.advance();
            long
        } else {
            short
        }
    }

    fn next_token(&mut self) -> ParseResult<PositionedToken> {
        self.skip_blank();
        let location = self.current_location();
        let start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(PositionedToken { token: Token::Eof, span: Span::new(start, start), location });
        };

        let token = match c {
            '"' => self.read_string()?,
            c if c.is_ascii_digit() => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => Token::Ident(self.read_ident()),
            '@' => {
                self.advance();
                let name = self.read_ident();
                if name.is_empty() {
                    return Err(ParseError::lexical_error("expected macro name after '@'", location.line, location.column));
                }
                Token::Macro(name)
            }
            _ => {
                self.advance();
                match c {
                    '\n' => Token::Newline,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    ',' => Token::Comma,
                    ';' => Token::Semicolon,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '^' => Token::Caret,
                    '.' => {
                        if self.peek() == Some('.') && self.peek_second() == Some('.') {
                            self.advance();
                            self.advance();
                            Token::Ellipsis
                        } else {
                            Token::Dot
                        }
                    }
                    ':' => self.pick(':', Token::DoubleColon, Token::Colon),
                    '=' => self.pick('=', Token::EqEq, Token::Assign),
                    '!' => self.pick('=', Token::NotEq, Token::Bang),
                    '<' => {
                        if self.peek() == Some(':') {
                            self.advance();
                            Token::Subtype
                        } else {
                            self.pick('=', Token::Le, Token::Lt)
                        }
                    }
                    '>' => self.pick('=', Token::Ge, Token::Gt),
                    '&' if self.peek() == Some('&') => {
                        self.advance();
                        Token::AndAnd
                    }
                    '|' if self.peek() == Some('|') => {
                        self.advance();
                        Token::OrOr
                    }
                    other => {
                        return Err(ParseError::lexical_error(
                            format!("unexpected character '{}'", other),
                            location.line,
                            location.column,
                        ));
                    }
                }
            }
        };

        Ok(PositionedToken { token, span: Span::new(start, self.pos), location })
    }

    /// Tokenize the entire input; the last token is always `Eof`
    pub fn tokenize(&mut self) -> ParseResult<Vec<PositionedToken>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Tokenize a string
pub fn tokenize(input: &str) -> ParseResult<Vec<PositionedToken>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_tokenize_call() {
        assert_eq!(
            kinds("result = add(2, 3)"),
            vec![
                Token::Ident("result".into()),
                Token::Assign,
                Token::Ident("add".into()),
                Token::LParen,
                Token::Int(2),
                Token::Comma,
                Token::Int(3),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = tokenize("result = add(2, 3)").unwrap();
        assert_eq!(tokens[2].span, Span::new(9, 12));
        assert_eq!(tokens[2].location, SourceLocation::new(1, 10));
    }

    #[test]
    fn test_signature_punctuation() {
        assert_eq!(
            kinds("f(::Float64, xs...) where T<:Real"),
            vec![
                Token::Ident("f".into()),
                Token::LParen,
                Token::DoubleColon,
                Token::Ident("Float64".into()),
                Token::Comma,
                Token::Ident("xs".into()),
                Token::Ellipsis,
                Token::RParen,
                Token::Ident("where".into()),
                Token::Ident("T".into()),
                Token::Subtype,
                Token::Ident("Real".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_bang_identifiers_and_not_equal() {
        assert_eq!(
            kinds("push!(a, 1) != x"),
            vec![
                Token::Ident("push!".into()),
                Token::LParen,
                Token::Ident("a".into()),
                Token::Comma,
                Token::Int(1),
                Token::RParen,
                Token::NotEq,
                Token::Ident("x".into()),
                Token::Eof,
            ]
        );
        assert_eq!(kinds("a!=b")[1], Token::NotEq);
    }

    #[test]
    fn test_comments_newlines_and_numbers() {
        assert_eq!(
            kinds("x = 1.5e2 # note\ny = 1:3"),
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Float(150.0),
                Token::Newline,
                Token::Ident("y".into()),
                Token::Assign,
                Token::Int(1),
                Token::Colon,
                Token::Int(3),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unclosed_string() {
        assert!(matches!(tokenize("\"abc"), Err(ParseError::UnexpectedEof { .. })));
    }
}
