//! JSON-RPC 2.0 message types.
//!
//! Defines the request, notification and response shapes exchanged with the
//! camera service.

// ============================================================================
// Imports
// ============================================================================

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Version
// ============================================================================

/// Protocol version string carried in every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// The `"jsonrpc": "2.0"` marker.
///
/// Serializes as the version string and refuses any other value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(Version)
        } else {
            Err(D::Error::custom(format!(
                "unsupported jsonrpc version: {version}"
            )))
        }
    }
}

/// Normalizes optional params to an object.
///
/// Absent params are sent as `{}`.
#[inline]
fn params_or_empty(params: Option<Value>) -> Value {
    params.unwrap_or_else(|| Value::Object(Map::new()))
}

// ============================================================================
// Request
// ============================================================================

/// A method call from client to server.
///
/// # Format
///
/// ```json
/// {"jsonrpc": "2.0", "method": "get_camera_list", "params": {}, "id": 1}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol marker.
    pub jsonrpc: Version,

    /// Method name.
    pub method: String,

    /// Method parameters.
    #[serde(default)]
    pub params: Value,

    /// Correlation id.
    pub id: RequestId,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Version,
            method: method.into(),
            params: params_or_empty(params),
            id,
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A one-way message with no id.
///
/// Sent by the client through `send_notification`, and received from the
/// server as a push update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Protocol marker.
    #[serde(default)]
    pub jsonrpc: Version,

    /// Method (event) name.
    pub method: String,

    /// Event payload.
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    /// Creates a new notification.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Version,
            method: method.into(),
            params: params_or_empty(params),
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from server to client.
///
/// # Format
///
/// Success:
/// ```json
/// {"jsonrpc": "2.0", "result": {"cameras": [], "total": 0}, "id": 1}
/// ```
///
/// Error:
/// ```json
/// {"jsonrpc": "2.0", "error": {"code": -32601, "message": "Method not found"}, "id": 2}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Protocol marker.
    #[serde(default)]
    pub jsonrpc: Version,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error object (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,

    /// Matches the request `id`.
    pub id: RequestId,
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: Version,
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: RequestId, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: Version,
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// A success response without `result` yields `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if the server sent an error object.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// RpcErrorObject
// ============================================================================

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Error code.
    pub code: i64,

    /// Short description.
    pub message: String,

    /// Additional server-defined data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Creates an error object without data.
    #[inline]
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<RpcErrorObject> for Error {
    fn from(error: RpcErrorObject) -> Self {
        Error::rpc(error.code, error.message, error.data)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = Request::new(RequestId::new(1), "get_camera_list", None);
        let value = serde_json::to_value(&request).expect("serialize");

        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "get_camera_list", "params": {}, "id": 1})
        );
    }

    #[test]
    fn test_request_keeps_params() {
        let request = Request::new(
            RequestId::new(3),
            "get_camera_status",
            Some(json!({"device": "camera0"})),
        );
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains(r#""params":{"device":"camera0"}"#));
    }

    #[test]
    fn test_notification_has_no_id() {
        let notification = Notification::new("client_ready", None);
        let value = serde_json::to_value(&notification).expect("serialize");
        assert!(value.get("id").is_none());
        assert_eq!(value["method"], "client_ready");
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{"jsonrpc":"2.0","result":{"cameras":[],"total":0},"id":1}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(!response.is_error());
        assert_eq!(response.id, RequestId::new(1));

        let result = response.into_result().expect("should succeed");
        assert_eq!(result, json!({"cameras": [], "total": 0}));
    }

    #[test]
    fn test_error_response() {
        let json_str =
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":2}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_error());

        let err = response.into_result().unwrap_err();
        assert_eq!(err.rpc_code(), Some(-32601));
    }

    #[test]
    fn test_error_response_with_data() {
        let json_str = r#"{
            "jsonrpc": "2.0",
            "error": {"code": -32001, "message": "Authentication failed", "data": {"reason": "expired"}},
            "id": 5
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        match response.into_result() {
            Err(Error::Rpc { code, data, .. }) => {
                assert_eq!(code, -32001);
                assert_eq!(data, Some(json!({"reason": "expired"})));
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_result_is_null() {
        let response: Response = serde_json::from_str(r#"{"jsonrpc":"2.0","id":4}"#).expect("parse");
        assert_eq!(response.into_result().expect("ok"), Value::Null);
    }

    #[test]
    fn test_rejects_wrong_version() {
        let result = serde_json::from_str::<Response>(r#"{"jsonrpc":"1.0","result":1,"id":1}"#);
        assert!(result.is_err());
    }
}
