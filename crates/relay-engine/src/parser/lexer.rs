//! Lexer for Relay script.
//!
//! This module implements the lexer using the logos library. It converts
//! component source into a stream of tokens with line/column information.

use crate::parser::token::{Span, Token};
use logos::{FilterResult, Logos};

/// Logos-based token enum for lexing.
///
/// This enum is used internally by logos for efficient tokenization.
/// It's converted to our main Token enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum LogosToken {
    #[token("/*", block_comment)]
    BlockComment,

    // Keywords (must come before identifiers)
    #[token("function")]
    Function,
    #[token("class")]
    Class,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("extends")]
    Extends,
    #[token("static")]
    Static,
    #[token("import")]
    Import,
    #[token("as")]
    As,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("of")]
    Of,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("throw")]
    Throw,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("typeof")]
    Typeof,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Literals
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", parse_float)]
    Float(f64),

    #[regex(r"[0-9][0-9_]*", parse_decimal)]
    #[regex(r"0[xX][0-9a-fA-F][0-9a-fA-F_]*", |lex| parse_radix(lex.slice(), 16))]
    #[regex(r"0[bB][01][01_]*", |lex| parse_radix(lex.slice(), 2))]
    Int(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, unescape_literal)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, unescape_literal)]
    Str(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators
    #[token("===")]
    #[token("==")]
    EqualEqual,
    #[token("!==")]
    #[token("!=")]
    BangEqual,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("??")]
    QuestionQuestion,
    #[token("**")]
    StarStar,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("*=")]
    StarEqual,
    #[token("/=")]
    SlashEqual,
    #[token("%=")]
    PercentEqual,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("=")]
    Equal,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
}

fn block_comment(lex: &mut logos::Lexer<'_, LogosToken>) -> FilterResult<(), ()> {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(rest.len());
            FilterResult::Error(())
        }
    }
}

fn parse_decimal(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<i64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_radix(text: &str, radix: u32) -> Option<i64> {
    let digits = text[2..].replace('_', "");
    i64::from_str_radix(&digits, radix).ok()
}

fn parse_float(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

fn unescape_literal(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<String> {
    let slice = lex.slice();
    unescape(&slice[1..slice.len() - 1])
}

/// Resolve backslash escapes in a string literal body.
///
/// Returns `None` on an unknown or malformed escape.
fn unescape(body: &str) -> Option<String> {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            'r' => result.push('\r'),
            '0' => result.push('\0'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            '\'' => result.push('\''),
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let mut hex = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        h if h.is_ascii_hexdigit() && hex.len() < 6 => hex.push(h),
                        _ => return None,
                    }
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                result.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(result)
}

impl From<LogosToken> for Token {
    fn from(token: LogosToken) -> Self {
        match token {
            // Skipped by its callback, never emitted
            LogosToken::BlockComment => Token::Eof,
            LogosToken::Function => Token::Function,
            LogosToken::Class => Token::Class,
            LogosToken::Let => Token::Let,
            LogosToken::Const => Token::Const,
            LogosToken::Extends => Token::Extends,
            LogosToken::Static => Token::Static,
            LogosToken::Import => Token::Import,
            LogosToken::As => Token::As,
            LogosToken::If => Token::If,
            LogosToken::Else => Token::Else,
            LogosToken::While => Token::While,
            LogosToken::For => Token::For,
            LogosToken::Of => Token::Of,
            LogosToken::Break => Token::Break,
            LogosToken::Continue => Token::Continue,
            LogosToken::Return => Token::Return,
            LogosToken::Try => Token::Try,
            LogosToken::Catch => Token::Catch,
            LogosToken::Throw => Token::Throw,
            LogosToken::New => Token::New,
            LogosToken::This => Token::This,
            LogosToken::Super => Token::Super,
            LogosToken::Typeof => Token::Typeof,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Null => Token::Null,
            LogosToken::Float(n) => Token::FloatLiteral(n),
            LogosToken::Int(n) => Token::IntLiteral(n),
            LogosToken::Str(s) => Token::StringLiteral(s),
            LogosToken::Identifier(name) => Token::Identifier(name),
            LogosToken::EqualEqual => Token::EqualEqual,
            LogosToken::BangEqual => Token::BangEqual,
            LogosToken::LessEqual => Token::LessEqual,
            LogosToken::GreaterEqual => Token::GreaterEqual,
            LogosToken::Less => Token::Less,
            LogosToken::Greater => Token::Greater,
            LogosToken::AmpAmp => Token::AmpAmp,
            LogosToken::PipePipe => Token::PipePipe,
            LogosToken::QuestionQuestion => Token::QuestionQuestion,
            LogosToken::StarStar => Token::StarStar,
            LogosToken::PlusEqual => Token::PlusEqual,
            LogosToken::MinusEqual => Token::MinusEqual,
            LogosToken::StarEqual => Token::StarEqual,
            LogosToken::SlashEqual => Token::SlashEqual,
            LogosToken::PercentEqual => Token::PercentEqual,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::Bang => Token::Bang,
            LogosToken::Equal => Token::Equal,
            LogosToken::Question => Token::Question,
            LogosToken::Dot => Token::Dot,
            LogosToken::Colon => Token::Colon,
            LogosToken::LeftParen => Token::LeftParen,
            LogosToken::RightParen => Token::RightParen,
            LogosToken::LeftBrace => Token::LeftBrace,
            LogosToken::RightBrace => Token::RightBrace,
            LogosToken::LeftBracket => Token::LeftBracket,
            LogosToken::RightBracket => Token::RightBracket,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Comma => Token::Comma,
        }
    }
}

/// Maps byte offsets to 1-based line/column positions.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    fn span(&self, source: &str, start: usize, end: usize) -> Span {
        let line = match self.line_starts.binary_search(&start) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source[line_start..start].chars().count() + 1;
        Span::new(start, end, line as u32 + 1, column as u32)
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { char: char, span: Span },
    UnterminatedString { span: Span },
    UnterminatedComment { span: Span },
    InvalidNumber { text: String, span: Span },
    InvalidEscape { text: String, span: Span },
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Format all errors with source context
    pub fn format_errors(errors: &[LexError], source: &str) -> String {
        errors
            .iter()
            .map(|e| e.format_with_source(source))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tokenize the whole source. The returned stream always ends with `Token::Eof`.
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let index = LineIndex::new(self.source);
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        let mut lex = LogosToken::lexer(self.source);
        while let Some(result) = lex.next() {
            let range = lex.span();
            let span = index.span(self.source, range.start, range.end);
            match result {
                Ok(token) => tokens.push((Token::from(token), span)),
                Err(()) => errors.push(classify_error(lex.slice(), span)),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let end = self.source.len();
        tokens.push((Token::Eof, index.span(self.source, end, end)));
        Ok(tokens)
    }
}

/// Work out why logos rejected `slice`.
fn classify_error(slice: &str, span: Span) -> LexError {
    let first = slice.chars().next().unwrap_or('\0');
    if slice.starts_with("/*") {
        LexError::UnterminatedComment { span }
    } else if first == '"' || first == '\'' {
        if slice.len() >= 2 && slice.ends_with(first) {
            LexError::InvalidEscape {
                text: slice.to_string(),
                span,
            }
        } else {
            LexError::UnterminatedString { span }
        }
    } else if first.is_ascii_digit() {
        LexError::InvalidNumber {
            text: slice.to_string(),
            span,
        }
    } else {
        LexError::UnexpectedCharacter { char: first, span }
    }
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidNumber { span, .. }
            | LexError::InvalidEscape { span, .. } => *span,
        }
    }

    pub fn description(&self) -> String {
        match self {
            LexError::UnexpectedCharacter { char, .. } => {
                format!("Unexpected character '{}'", char)
            }
            LexError::UnterminatedString { .. } => "Unterminated string literal".to_string(),
            LexError::UnterminatedComment { .. } => "Unterminated block comment".to_string(),
            LexError::InvalidNumber { text, .. } => format!("Invalid number literal '{}'", text),
            LexError::InvalidEscape { text, .. } => {
                format!("Invalid escape sequence in {}", text)
            }
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            LexError::UnterminatedString { .. } => {
                Some("String literals must be closed on the same line")
            }
            LexError::InvalidNumber { .. } => Some("Integer literals must fit in 64 bits"),
            LexError::InvalidEscape { .. } => {
                Some("Valid escapes are \\n \\t \\r \\0 \\\\ \\\" \\' and \\u{XXXX}")
            }
            _ => None,
        }
    }

    /// Render the error with the offending source line and a caret.
    pub fn format_with_source(&self, source: &str) -> String {
        let span = self.span();
        let mut result = format!(
            "Error at {}:{}: {}\n",
            span.line,
            span.column,
            self.description()
        );

        if let Some(error_line) = source.lines().nth((span.line as usize).saturating_sub(1)) {
            result.push_str("  |\n");
            result.push_str(&format!("{:3} | {}\n", span.line, error_line));
            result.push_str(&format!(
                "  | {}^\n",
                " ".repeat((span.column as usize).saturating_sub(1))
            ));
        }

        if let Some(hint) = self.hint() {
            result.push_str(&format!("\nHint: {}\n", hint));
        }

        result
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.description(),
            self.span().line,
            self.span().column
        )
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb").as_deref(), Some("a\nb"));
        assert_eq!(unescape(r"\u{41}\u{1F600}").as_deref(), Some("A\u{1F600}"));
        assert_eq!(unescape(r"\q"), None);
        assert_eq!(unescape(r"\u{110000}"), None);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a /* block\n comment */ b // trailing"),
            vec![
                Token::Identifier("a".into()),
                Token::Identifier("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = Lexer::new("let x\n  = 1").tokenize().unwrap();
        assert_eq!((tokens[0].1.line, tokens[0].1.column), (1, 1));
        assert_eq!((tokens[2].1.line, tokens[2].1.column), (2, 3));
        assert_eq!((tokens[3].1.line, tokens[3].1.column), (2, 5));
    }

    #[test]
    fn test_unterminated_comment() {
        let errors = Lexer::new("a /* never closed").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnterminatedComment { .. }));
    }
}
