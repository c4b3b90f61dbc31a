//! Inbound RPC envelope types.
//!
//! The host application multiplexes many unrelated message kinds over
//! one channel; the bridge claims only envelopes whose `target` equals
//! its configured identifier.
//!
//! # Format
//!
//! ```json
//! {
//!   "target": "signer-bridge",
//!   "action": "signTransaction",
//!   "params": { "hdPath": "m/44'/60'/0'/0/0", "tx": "f86c..." }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// ActionKind
// ============================================================================

/// Recognized RPC actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Establish (or verify) a device session.
    MakeSession,
    /// Change the preferred physical transport.
    UpdateTransport,
    /// Probe the open application's name and version.
    GetAppNameAndVersion,
    /// Read the signing application's configuration.
    GetAppConfiguration,
    /// Derive an address and public key for a path.
    GetPublicKey,
    /// Clear-sign a serialized transaction.
    SignTransaction,
    /// Sign a personal message.
    SignPersonalMessage,
    /// Sign a structured typed-data message.
    SignTypedData,
}

impl ActionKind {
    /// Parses an action from its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "makeSession" => Some(Self::MakeSession),
            "updateTransport" => Some(Self::UpdateTransport),
            "getAppNameAndVersion" => Some(Self::GetAppNameAndVersion),
            "getAppConfiguration" => Some(Self::GetAppConfiguration),
            "getPublicKey" => Some(Self::GetPublicKey),
            "signTransaction" => Some(Self::SignTransaction),
            "signPersonalMessage" => Some(Self::SignPersonalMessage),
            "signTypedData" => Some(Self::SignTypedData),
            _ => None,
        }
    }
}

// ============================================================================
// ActionRequest
// ============================================================================

/// An inbound envelope, before action resolution.
///
/// `action` stays a plain string here so an unrecognized action can be
/// reported back by name instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    /// Well-known bridge identifier; non-matching envelopes are ignored.
    pub target: String,

    /// Action name, resolved via [`ActionKind::from_name`].
    pub action: String,

    /// Action parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

// ============================================================================
// Params
// ============================================================================

/// Typed accessors over the raw `params` object.
///
/// Every accessor raises [`Error::Validation`] before any device I/O
/// can happen.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    params: Option<&'a Value>,
}

impl<'a> Params<'a> {
    /// Wraps the optional params object of a request.
    #[inline]
    #[must_use]
    pub const fn new(params: Option<&'a Value>) -> Self {
        Self { params }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.params.and_then(|params| params.get(name))
    }

    /// Requires a non-empty string parameter.
    ///
    /// # Errors
    ///
    /// `Missing {name} parameter` when absent, not a string, or empty.
    pub fn require_str(&self, name: &str) -> Result<&'a str> {
        self.get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::missing_parameter(name))
    }

    /// Requires the derivation path parameter.
    ///
    /// # Errors
    ///
    /// `Missing hdPath parameter` when absent or empty.
    pub fn require_hd_path(&self) -> Result<&'a str> {
        self.require_str("hdPath")
    }

    /// Requires a structured typed-data `message` parameter.
    ///
    /// # Errors
    ///
    /// - `Missing message parameter` when absent
    /// - [`Error::Validation`] when present but not an object carrying
    ///   `domain`, `types`, `primaryType` and `message` fields
    pub fn require_typed_data(&self) -> Result<TypedData> {
        let raw = self
            .get("message")
            .ok_or_else(|| Error::missing_parameter("message"))?;
        serde_json::from_value(raw.clone()).map_err(|_| {
            Error::validation(
                "Invalid message parameter: expected domain, types, primaryType and message fields",
            )
        })
    }
}

// ============================================================================
// TypedData
// ============================================================================

/// A structured typed-data signing payload.
///
/// Forwarded to the device as-is for on-screen rendering; the bridge
/// never interprets the field contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Domain separator fields.
    pub domain: Value,
    /// Type definitions.
    pub types: Value,
    /// Name of the root type.
    pub primary_type: Value,
    /// The message body to sign.
    pub message: Value,
}

// ============================================================================
// Tests
// ============================================================================
