//! Relay script parser: lexical analysis (tokenization) and syntactic analysis.
//!
//! # Example
//!
//! ```ignore
//! use relay_engine::parser::Lexer;
//!
//! let source = r#"
//!     function add(a, b = 1) {
//!         return a + b;
//!     }
//! "#;
//!
//! match Lexer::new(source).tokenize() {
//!     Ok(tokens) => {
//!         for (token, span) in tokens {
//!             println!("{:?} at {}:{}", token, span.line, span.column);
//!         }
//!     }
//!     Err(errors) => {
//!         for err in errors {
//!             eprintln!("{}", err);
//!         }
//!     }
//! }
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

// Re-exports for convenience
pub use ast::Program;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use token::{Span, Token};

use crate::vm::EngineError;

/// Lex and parse a whole source unit.
pub fn parse_program(source: &str) -> Result<Program, EngineError> {
    let parser = Parser::new(source).map_err(EngineError::Lex)?;
    Ok(parser.parse()?)
}

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::*;

    fn expr(source: &str) -> Expression {
        let program = parse_program(source).unwrap();
        match program.statements.into_iter().next() {
            Some(Statement::Expression(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let Expression::Binary { op, right, .. } = expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expression::Binary { op: BinaryOp::Multiply, .. }));
    }

    #[test]
    fn test_power_is_right_associative() {
        let Expression::Binary { op, right, .. } = expr("2 ** 3 ** 2") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Power);
        assert!(matches!(*right, Expression::Binary { op: BinaryOp::Power, .. }));
    }

    #[test]
    fn test_named_arguments() {
        let Expression::Call { args, .. } = expr("range(1, stop: 10)") else {
            panic!("expected call");
        };
        assert_eq!(args[0].name, None);
        assert_eq!(args[1].name.as_deref(), Some("stop"));
        assert!(parse_program("f(a: 1, 2)").is_err());
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse_program("1 = 2").is_err());
        assert!(parse_program("a.b[0] += 2").is_ok());
    }

    #[test]
    fn test_keywords_as_property_names() {
        let Expression::Member { property, .. } = expr("obj.class") else {
            panic!("expected member");
        };
        assert_eq!(property, "class");
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        let err = parse_program(&deep).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Parse(ParseError { kind: ParseErrorKind::LimitExceeded, .. })
        ));
    }

    #[test]
    fn test_lex_errors_surface() {
        assert!(matches!(parse_program("let s = \"open"), Err(EngineError::Lex(_))));
    }
}
