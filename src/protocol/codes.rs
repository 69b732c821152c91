//! Well-known JSON-RPC error codes.
//!
//! Callers branch on these through [`Error::rpc_code`](crate::Error::rpc_code).

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Authentication failed or token expired.
pub const AUTH_FAILED: i64 = -32001;

/// Caller lacks the role required for the method.
pub const PERMISSION_DENIED: i64 = -32003;

/// Returns `true` for codes reserved by the JSON-RPC specification.
#[inline]
#[must_use]
pub const fn is_reserved(code: i64) -> bool {
    code >= -32768 && code <= -32000
}
