//! Engine error types

use crate::parser::{LexError, ParseError};
use crate::vm::Value;

/// Runtime errors raised while executing Relay script.
///
/// Every variant except [`VmError::Internal`] is catchable by `try`/`catch`.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Name not bound in any visible scope
    #[error("name '{0}' is not defined")]
    UndefinedVariable(String),

    /// Assignment to a `const` binding
    #[error("cannot assign to constant '{0}'")]
    ConstAssignment(String),

    /// Operation applied to a value of the wrong type
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Attribute lookup failed
    #[error("'{type_name}' object has no attribute '{attr}'")]
    AttributeError { type_name: String, attr: String },

    /// List or string index out of range
    #[error("IndexError: {0}")]
    IndexError(String),

    /// Missing dict key
    #[error("KeyError: {0}")]
    KeyError(String),

    /// Arguments do not fit the callee's parameters
    #[error("ArgumentError: {0}")]
    ArgumentError(String),

    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed i64
    #[error("integer overflow in {0}")]
    Overflow(String),

    /// Call of a non-callable value
    #[error("'{0}' object is not callable")]
    NotCallable(String),

    /// Value raised with `throw` (or `error(...)`) and not caught
    #[error("{0}")]
    Thrown(Value),

    /// `break`/`continue`/`return` in a position that cannot take it
    #[error("'{0}' outside of {1}")]
    InvalidControlFlow(&'static str, &'static str),

    /// Call depth exceeded `MAX_CALL_DEPTH`
    #[error("maximum call depth ({0}) exceeded")]
    StackOverflow(usize),

    /// Component import failed
    #[error("ImportError: {0}")]
    Import(String),

    /// Invariant violated inside the engine
    #[error("internal error: {0}")]
    Internal(String),
}

impl VmError {
    pub fn type_error(message: impl Into<String>) -> Self {
        VmError::TypeError(message.into())
    }

    pub fn argument_error(message: impl Into<String>) -> Self {
        VmError::ArgumentError(message.into())
    }

    pub fn no_attribute(value: &Value, attr: &str) -> Self {
        VmError::AttributeError {
            type_name: value.type_name().to_string(),
            attr: attr.to_string(),
        }
    }

    /// Whether script code may intercept this error with `try`/`catch`.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, VmError::Internal(_))
    }

    /// The value a `catch (e)` clause binds for this error.
    pub fn to_value(&self) -> Value {
        match self {
            VmError::Thrown(value) => value.clone(),
            other => Value::str(other.to_string()),
        }
    }
}

/// Anything that can go wrong turning source text into a result.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{}", format_lex_errors(.0))]
    Lex(Vec<LexError>),

    #[error("SyntaxError: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] VmError),
}

fn format_lex_errors(errors: &[LexError]) -> String {
    errors
        .iter()
        .map(|e| format!("SyntaxError: {}", e))
        .collect::<Vec<_>>()
        .join("; ")
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
