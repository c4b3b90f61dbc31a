//! Outbound RPC response types.
//!
//! Every handled request produces exactly one [`ActionResponse`].
//! Failures cross the wire as a [`SerializedError`]; the numeric
//! device status code is the one piece of error context that must
//! survive the boundary, because hosts branch on it.
//!
//! # Format
//!
//! Success:
//! ```json
//! { "success": true, "payload": { "v": 38, "r": "...", "s": "..." } }
//! ```
//!
//! Failure:
//! ```json
//! { "success": false, "payload": { "error": { "message": "...", "name": "HardwareStatusError", "statusCode": 27404 } } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Error;

// ============================================================================
// SerializedError
// ============================================================================

/// Wire form of an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    /// Human-readable failure description.
    pub message: String,

    /// Taxonomy name of the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Raw device status word, present only for device errors.
    #[serde(rename = "statusCode", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl From<&Error> for SerializedError {
    fn from(error: &Error) -> Self {
        Self {
            message: error.to_string(),
            name: Some(error.name().to_string()),
            status_code: error.status_code(),
        }
    }
}

// ============================================================================
// ActionResponse
// ============================================================================

/// One response per handled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the operation succeeded.
    pub success: bool,

    /// Operation result, or `{ "error": SerializedError }` on failure.
    pub payload: Value,
}

impl ActionResponse {
    /// Wraps a successful operation result.
    #[inline]
    #[must_use]
    pub const fn ok(payload: Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    /// Wraps a failure.
    #[must_use]
    pub fn fail(error: &Error) -> Self {
        Self {
            success: false,
            payload: json!({ "error": SerializedError::from(error) }),
        }
    }

    /// Returns the serialized error, if this is a failure response.
    #[must_use]
    pub fn error(&self) -> Option<SerializedError> {
        if self.success {
            return None;
        }
        self.payload
            .get("error")
            .cloned()
            .and_then(|error| serde_json::from_value(error).ok())
    }
}

// ============================================================================
// Tests
// ============================================================================
