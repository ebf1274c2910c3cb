//! Recursive-descent parser for Relay script.
//!
//! The parser consumes the token stream produced by [`Lexer`](crate::parser::Lexer)
//! and builds a [`Program`]. Statement parsing lives in `stmt`, expression
//! parsing (precedence climbing) in `expr`, and nesting/loop limits in `guards`.

pub mod expr;
pub mod guards;
pub mod stmt;

use crate::parser::ast::Program;
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};

/// Parse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that cannot start or continue the current construct
    UnexpectedToken,
    /// Well-formed tokens in an invalid arrangement (bad assignment target, ...)
    InvalidSyntax,
    /// Nesting depth or loop guard exceeded
    LimitExceeded,
}

/// Parse error with location
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {span}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn unexpected_token(expected: &[Token], found: &Token, span: Span) -> Self {
        let message = match expected {
            [] => format!("Unexpected token '{}'", found),
            [one] => format!("Expected '{}', found '{}'", one, found),
            many => format!(
                "Expected one of {}, found '{}'",
                many.iter()
                    .map(|t| format!("'{}'", t))
                    .collect::<Vec<_>>()
                    .join(", "),
                found
            ),
        };
        Self {
            kind: ParseErrorKind::UnexpectedToken,
            message,
            span,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            message: message.into(),
            span,
        }
    }

    pub fn parser_limit_exceeded(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::LimitExceeded,
            message: message.into(),
            span,
        }
    }
}

/// Parser state over a lexed token stream.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// Current nesting depth, checked against `guards::MAX_PARSE_DEPTH`
    pub(crate) depth: usize,
    /// Number of enclosing blocks; `import` is only valid at zero
    pub(crate) block_depth: usize,
}

impl Parser {
    /// Lex `source` and prepare a parser over it.
    pub fn new(source: &str) -> Result<Self, Vec<LexError>> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self::from_tokens(tokens))
    }

    /// Build a parser over an existing token stream (must end with `Token::Eof`).
    pub fn from_tokens(mut tokens: Vec<(Token, Span)>) -> Self {
        if !matches!(tokens.last(), Some((Token::Eof, _))) {
            let end = tokens.last().map(|(_, s)| *s).unwrap_or_default();
            tokens.push((Token::Eof, end));
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
            block_depth: 0,
        }
    }

    /// Parse the whole token stream into a program.
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        let mut guard = guards::LoopGuard::new("program");
        while !self.at_end() {
            guard.check()?;
            statements.push(stmt::parse_statement(&mut self)?);
        }
        Ok(Program { statements })
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    /// Token after the current one.
    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(t, _)| t)
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    pub(crate) fn advance(&mut self) -> (Token, Span) {
        let item = self.tokens[self.pos].clone();
        if !self.at_end() {
            self.pos += 1;
        }
        item
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    /// Consume the current token if it equals `token`.
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: Token) -> Result<Span, ParseError> {
        if self.check(&token) {
            Ok(self.advance().1)
        } else {
            Err(self.unexpected_token(&[token]))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                let span = self.advance().1;
                Ok((name, span))
            }
            _ => Err(self.unexpected_token(&[Token::Identifier("identifier".into())])),
        }
    }

    /// Identifier or keyword used as a name (after `.`, as a method name, ...).
    pub(crate) fn expect_property_name(&mut self) -> Result<(String, Span), ParseError> {
        if let Some(text) = self.current().keyword_text() {
            let span = self.advance().1;
            return Ok((text.to_string(), span));
        }
        self.expect_identifier()
    }

    pub(crate) fn unexpected_token(&self, expected: &[Token]) -> ParseError {
        ParseError::unexpected_token(expected, self.current(), self.current_span())
    }
}
