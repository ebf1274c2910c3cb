//! Bridge error types.

use crate::resolve::ResolveError;

/// Errors reported to bridge clients.
///
/// Every variant maps to one `errorType` string on the wire, see
/// [`BridgeError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Resolution, parsing or top-level execution of a component failed
    #[error("cannot load component '{name}': {message}")]
    ComponentLoad { name: String, message: String },

    #[error("class '{0}' is not defined in the loaded component")]
    ClassNotFound(String),

    #[error("function '{0}' is not defined in the loaded component")]
    FunctionNotFound(String),

    #[error("variable '{0}' is not defined in the loaded component")]
    VariableNotFound(String),

    #[error("no object registered as '{0}'")]
    ObjectNotFound(String),

    #[error("object '{id}' has no method '{method}'")]
    MethodNotFound { id: String, method: String },

    /// Field initializers or the constructor failed
    #[error("{message}")]
    Constructor { class: String, message: String },

    /// A function or method failed while running
    #[error("{message}")]
    Invocation { target: String, message: String },

    /// Evaluated code failed to parse or run
    #[error("{0}")]
    Eval(String),

    /// No operation with this name
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    /// Malformed request parameters
    #[error("{0}")]
    Argument(String),

    /// A panic was caught below the dispatcher
    #[error("internal error: {0}")]
    Internal(String),

    /// A request could not be decoded
    #[error("{0}")]
    Parse(String),
}

impl BridgeError {
    /// The `errorType` reported on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::ComponentLoad { .. } => "ComponentLoadError",
            BridgeError::ClassNotFound(_) => "ClassNotFound",
            BridgeError::FunctionNotFound(_) => "FunctionNotFound",
            BridgeError::VariableNotFound(_) => "VariableNotFound",
            BridgeError::ObjectNotFound(_) => "ObjectNotFound",
            BridgeError::MethodNotFound { .. } => "MethodNotFound",
            BridgeError::Constructor { .. } => "ConstructorError",
            BridgeError::Invocation { .. } => "InvocationError",
            BridgeError::Eval(_) => "EvalError",
            BridgeError::UnknownMethod(_) => "UnknownMethod",
            BridgeError::Argument(_) => "ArgumentError",
            BridgeError::Internal(_) => "InternalError",
            BridgeError::Parse(_) => "ParseError",
        }
    }

    pub(crate) fn load(name: &str, message: impl ToString) -> Self {
        BridgeError::ComponentLoad {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invocation(target: &str, message: impl ToString) -> Self {
        BridgeError::Invocation {
            target: target.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<ResolveError> for BridgeError {
    fn from(err: ResolveError) -> Self {
        let name = err.component().to_string();
        BridgeError::ComponentLoad {
            name,
            message: err.to_string(),
        }
    }
}

/// Result type of bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_match_wire_names() {
        assert_eq!(BridgeError::ObjectNotFound("c1".into()).kind(), "ObjectNotFound");
        assert_eq!(BridgeError::Eval("x".into()).kind(), "EvalError");
        assert_eq!(BridgeError::load("m", "boom").kind(), "ComponentLoadError");
        assert_eq!(BridgeError::invocation("f", "boom").kind(), "InvocationError");
    }

    #[test]
    fn test_invocation_message_is_the_underlying_error() {
        assert_eq!(BridgeError::invocation("f", "boom").to_string(), "boom");
        assert_eq!(
            BridgeError::MethodNotFound {
                id: "c1".into(),
                method: "go".into()
            }
            .to_string(),
            "object 'c1' has no method 'go'"
        );
    }
}
