//! Parser guards to prevent infinite loops and stack overflow

use super::{ParseError, Parser};
use crate::parser::token::Span;

/// Maximum iterations for any parser loop
const MAX_LOOP_ITERATIONS: usize = 100_000;

/// Maximum nesting depth before rejecting parse
///
/// Kept low enough that deeply nested input is rejected before the
/// recursive-descent parser or the tree-walking interpreter can overflow
/// a 2 MiB worker thread stack.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Guard against runaway parser loops
///
/// # Example
///
/// ```ignore
/// let mut guard = LoopGuard::new("class_body");
/// while !parser.check(&Token::RightBrace) {
///     guard.check()?;
///     // ... parse a member ...
/// }
/// ```
pub struct LoopGuard {
    name: &'static str,
    count: usize,
    max: usize,
}

impl LoopGuard {
    /// Create a new loop guard with default limit
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            count: 0,
            max: MAX_LOOP_ITERATIONS,
        }
    }

    /// Check iteration count, return error if exceeded
    #[inline]
    pub fn check(&mut self) -> Result<(), ParseError> {
        self.count += 1;
        if self.count > self.max {
            return Err(ParseError::parser_limit_exceeded(
                format!("Loop '{}' exceeded {} iterations", self.name, self.max),
                Span::default(),
            ));
        }
        Ok(())
    }
}

/// Run `f` one nesting level deeper, failing once `MAX_PARSE_DEPTH` is reached.
///
/// The depth is restored whether `f` succeeds or not.
pub fn nested<T>(
    parser: &mut Parser,
    what: &str,
    f: impl FnOnce(&mut Parser) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    parser.depth += 1;
    if parser.depth > MAX_PARSE_DEPTH {
        parser.depth -= 1;
        return Err(ParseError::parser_limit_exceeded(
            format!("Maximum nesting depth ({}) exceeded in {}", MAX_PARSE_DEPTH, what),
            parser.current_span(),
        ));
    }
    let result = f(parser);
    parser.depth -= 1;
    result
}
