//! Inbound frame classification.
//!
//! Every text frame from the server is one of:
//!
//! | Shape | Classification |
//! |-------|----------------|
//! | numeric `id` plus `result` or `error` | [`Inbound::Response`] |
//! | no `id`, string `method` | [`Inbound::Notification`] |
//! | anything else | malformed ([`Error::Protocol`] / [`Error::Json`]) |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, from_str, from_value};

use crate::error::{Error, Result};

use super::{Notification, Response};

// ============================================================================
// Inbound
// ============================================================================

/// A classified server message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Reply to one of our requests.
    Response(Response),
    /// Server-initiated push.
    Notification(Notification),
}

impl Inbound {
    /// Parses and classifies a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not valid JSON
    /// - [`Error::Protocol`] if the JSON matches neither shape
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = from_str(text)?;
        Self::classify(value)
    }

    /// Classifies an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the value matches neither shape.
    pub fn classify(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::protocol("frame is not a JSON object"));
        };

        let has_id = object.get("id").is_some_and(|id| !id.is_null());
        let has_method = object.get("method").is_some_and(Value::is_string);
        let has_outcome = object.contains_key("result") || object.contains_key("error");

        if has_id {
            if has_method && !has_outcome {
                return Err(Error::protocol("server-initiated requests are not supported"));
            }
            return from_value(value)
                .map(Inbound::Response)
                .map_err(|e| Error::protocol(format!("invalid response: {e}")));
        }

        if has_method {
            return from_value(value)
                .map(Inbound::Notification)
                .map_err(|e| Error::protocol(format!("invalid notification: {e}")));
        }

        if has_outcome {
            return Err(Error::protocol("response without a correlatable id"));
        }

        Err(Error::protocol("frame is neither a response nor a notification"))
    }
}

// ============================================================================
// Tests
// ============================================================================
