//! The uniform success/failure envelope returned for every operation.

use relay_engine::Value;
use serde::{Deserialize, Serialize};

use crate::convert;
use crate::error::BridgeError;

/// Outcome of one operation as seen by clients.
///
/// Serializes as `{"error": false, "result": .., "type": ..}` or
/// `{"error": true, "errorType": .., "errorMessage": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        error: bool,
        result: serde_json::Value,
        #[serde(rename = "type")]
        type_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        error: bool,
        error_type: String,
        error_message: String,
    },
}

impl Envelope {
    pub fn success(value: &Value) -> Self {
        Envelope::Success {
            error: false,
            result: convert::to_json(value),
            type_name: convert::type_name(value),
        }
    }

    pub fn failure(err: &BridgeError) -> Self {
        Envelope::Failure {
            error: true,
            error_type: err.kind().to_string(),
            error_message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Failure { .. })
    }

    /// The result of a success envelope.
    pub fn result(&self) -> Option<&serde_json::Value> {
        match self {
            Envelope::Success { result, .. } => Some(result),
            Envelope::Failure { .. } => None,
        }
    }

    /// The `errorType` of a failure envelope.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Envelope::Success { .. } => None,
            Envelope::Failure { error_type, .. } => Some(error_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let envelope = Envelope::success(&Value::Int(3));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"error": false, "result": 3, "type": "int"})
        );
        assert!(!envelope.is_error());
    }

    #[test]
    fn test_failure_shape() {
        let envelope = Envelope::failure(&BridgeError::ObjectNotFound("c9".into()));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "error": true,
                "errorType": "ObjectNotFound",
                "errorMessage": "no object registered as 'c9'"
            })
        );
        assert_eq!(envelope.error_type(), Some("ObjectNotFound"));
    }

    #[test]
    fn test_parses_both_shapes() {
        let success: Envelope =
            serde_json::from_value(json!({"error": false, "result": [1], "type": "list"})).unwrap();
        assert_eq!(success.result(), Some(&json!([1])));

        let failure: Envelope = serde_json::from_value(
            json!({"error": true, "errorType": "EvalError", "errorMessage": "boom"}),
        )
        .unwrap();
        assert_eq!(failure.error_type(), Some("EvalError"));
    }
}
