//! Wire messages of the NDJSON transport.
//!
//! Each request and each response is one JSON object on its own line.

use relay_runtime::{BridgeError, Envelope};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Request message from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Client-chosen identifier echoed in the response
    pub id: u64,

    /// Operation name, e.g. `object.new`
    pub method: String,

    /// Positional (array) or named (object) parameters
    #[serde(default)]
    pub params: JsonValue,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: JsonValue) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Response message from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the request this answers; 0 when it could not be read
    pub id: u64,

    pub result: Envelope,
}

impl Response {
    pub fn new(id: u64, result: Envelope) -> Self {
        Self { id, result }
    }

    /// Response to a line that is not a valid request.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(0, Envelope::failure(&BridgeError::Parse(message.into())))
    }
}

/// Decode one request line. Undecodable lines yield the response to send.
pub fn decode_request(line: &str) -> Result<Request, Response> {
    serde_json::from_str(line.trim())
        .map_err(|e| Response::parse_error(format!("invalid request: {}", e)))
}

/// Encode a message as one line, newline included.
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_default_to_null() {
        let request = decode_request(r#"{"id": 3, "method": "hello"}"#).unwrap();
        assert_eq!(request.id, 3);
        assert!(request.params.is_null());
    }

    #[test]
    fn test_bad_lines_get_parse_errors() {
        for line in ["not json", r#"{"method": "hello"}"#, "[1, 2]"] {
            let response = decode_request(line).unwrap_err();
            assert_eq!(response.id, 0);
            assert_eq!(response.result.error_type(), Some("ParseError"));
        }
    }

    #[test]
    fn test_response_line() {
        let line = encode_line(&Response::new(
            7,
            Envelope::Success {
                error: false,
                result: json!(true),
                type_name: "bool".into(),
            },
        ))
        .unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(
            serde_json::from_str::<JsonValue>(&line).unwrap(),
            json!({"id": 7, "result": {"error": false, "result": true, "type": "bool"}})
        );
    }
}
