//! Token definitions for Relay script.
//!
//! This module defines all tokens that can appear in component source code,
//! including keywords, operators, literals, and special tokens.

use std::fmt;

/// A token in Relay script.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Declarations
    Function,
    Class,
    Let,
    Const,
    Extends,
    Static,
    Import,
    As,

    // Control flow
    If,
    Else,
    While,
    For,
    Of,
    Break,
    Continue,
    Return,
    Try,
    Catch,
    Throw,

    // OOP keywords
    New,
    This,
    Super,

    // Type operators
    Typeof,

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    True,
    False,
    Null,

    // Identifiers
    Identifier(String),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,

    // Unary
    Bang,

    // Comparison
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical
    AmpAmp,
    PipePipe,
    QuestionQuestion,

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,

    // Punctuation
    Question,
    Dot,
    Colon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,

    // Special
    Eof,
}

/// Source location of a token or syntax node.
///
/// `start`/`end` are byte offsets; `line`/`column` are 1-based and refer to `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering both `self` and `other`, positioned at `self`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Function => write!(f, "function"),
            Token::Class => write!(f, "class"),
            Token::Let => write!(f, "let"),
            Token::Const => write!(f, "const"),
            Token::Extends => write!(f, "extends"),
            Token::Static => write!(f, "static"),
            Token::Import => write!(f, "import"),
            Token::As => write!(f, "as"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::For => write!(f, "for"),
            Token::Of => write!(f, "of"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Return => write!(f, "return"),
            Token::Try => write!(f, "try"),
            Token::Catch => write!(f, "catch"),
            Token::Throw => write!(f, "throw"),
            Token::New => write!(f, "new"),
            Token::This => write!(f, "this"),
            Token::Super => write!(f, "super"),
            Token::Typeof => write!(f, "typeof"),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "\"{}\"", s),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::StarStar => write!(f, "**"),
            Token::Bang => write!(f, "!"),
            Token::EqualEqual => write!(f, "=="),
            Token::BangEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
            Token::QuestionQuestion => write!(f, "??"),
            Token::Equal => write!(f, "="),
            Token::PlusEqual => write!(f, "+="),
            Token::MinusEqual => write!(f, "-="),
            Token::StarEqual => write!(f, "*="),
            Token::SlashEqual => write!(f, "/="),
            Token::PercentEqual => write!(f, "%="),
            Token::Question => write!(f, "?"),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

impl Token {
    /// Returns true if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Function
                | Token::Class
                | Token::Let
                | Token::Const
                | Token::Extends
                | Token::Static
                | Token::Import
                | Token::As
                | Token::If
                | Token::Else
                | Token::While
                | Token::For
                | Token::Of
                | Token::Break
                | Token::Continue
                | Token::Return
                | Token::Try
                | Token::Catch
                | Token::Throw
                | Token::New
                | Token::This
                | Token::Super
                | Token::Typeof
                | Token::True
                | Token::False
                | Token::Null
        )
    }

    /// Returns true if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::IntLiteral(_)
                | Token::FloatLiteral(_)
                | Token::StringLiteral(_)
                | Token::True
                | Token::False
                | Token::Null
        )
    }

    /// Keywords that may still be used as attribute names after `.`
    /// (`list.of`, `obj.class`) or as named-argument labels.
    pub fn keyword_text(&self) -> Option<&'static str> {
        if !self.is_keyword() {
            return None;
        }
        Some(match self {
            Token::Function => "function",
            Token::Class => "class",
            Token::Let => "let",
            Token::Const => "const",
            Token::Extends => "extends",
            Token::Static => "static",
            Token::Import => "import",
            Token::As => "as",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::Of => "of",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Return => "return",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Throw => "throw",
            Token::New => "new",
            Token::This => "this",
            Token::Super => "super",
            Token::Typeof => "typeof",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        })
    }
}
