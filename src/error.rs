//! Error types for the signer bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use signer_bridge::{Result, Error};
//!
//! async fn example(sessions: &SessionManager) -> Result<()> {
//!     let session = sessions.ensure_session().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Environment | [`Error::UnsupportedEnvironment`] |
//! | Authorization | [`Error::NoPermittedDevice`] |
//! | Device | [`Error::HardwareStatus`] |
//! | RPC | [`Error::Validation`], [`Error::UnknownAction`] |
//! | Transport | [`Error::Transport`] |
//!
//! `Error` is `Clone`: the single-flight session guard hands the same
//! outcome to every concurrent caller, so the failure path must be
//! duplicable without re-running the establishment.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Status Words
// ============================================================================

/// Device status word: the device is locked and needs a PIN entry.
///
/// Hosts branch on this value to show a dedicated unlock prompt, so it
/// must survive serialization end-to-end.
pub const STATUS_DEVICE_LOCKED: u16 = 0x6b0c;

/// Device status word: the user rejected the operation on-device.
pub const STATUS_USER_REJECTED: u16 = 0x6985;

/// Device status word: the signing application is not open.
pub const STATUS_APP_NOT_OPEN: u16 = 0x6e00;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// The host platform has no hardware-transport capability at all.
    ///
    /// Fatal for the whole bridge session; nothing can be signed here.
    #[error("Hardware transport is not supported in this environment")]
    UnsupportedEnvironment,

    // ========================================================================
    // Authorization Errors
    // ========================================================================
    /// No authorized device of the expected vendor is available.
    ///
    /// Recoverable: the host must run its user-gesture permission flow
    /// and retry the request.
    #[error(
        "No permitted signing device available; authorize a device from a user gesture and retry"
    )]
    NoPermittedDevice,

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The device returned a non-success status word.
    ///
    /// The numeric status is preserved end-to-end so callers can detect
    /// specific conditions such as "device locked" ([`STATUS_DEVICE_LOCKED`]).
    #[error("Device returned status 0x{status:04x}")]
    HardwareStatus {
        /// Raw APDU status word (SW1 << 8 | SW2).
        status: u16,
    },

    // ========================================================================
    // RPC Errors
    // ========================================================================
    /// Malformed or missing RPC parameters.
    ///
    /// Raised before any device I/O happens.
    #[error("{message}")]
    Validation {
        /// Description of the invalid parameter.
        message: String,
    },

    /// RPC action name not recognized.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The unrecognized action name.
        action: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Any other transport-level failure (open/send/close/framing).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a hardware status error from a raw status word.
    #[inline]
    #[must_use]
    pub const fn hardware_status(status: u16) -> Self {
        Self::HardwareStatus { status }
    }

    /// Creates a validation error.
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a validation error for a missing required parameter.
    #[inline]
    pub fn missing_parameter(name: &str) -> Self {
        Self::Validation {
            message: format!("Missing {name} parameter"),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the taxonomy name used on the wire.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UnsupportedEnvironment => "UnsupportedEnvironment",
            Self::NoPermittedDevice => "NoPermittedDevice",
            Self::HardwareStatus { .. } => "HardwareStatusError",
            Self::Validation { .. } => "ValidationError",
            Self::UnknownAction { .. } => "UnknownAction",
            Self::Transport { .. } => "TransportError",
        }
    }

    /// Returns the device status word, if this is a device error.
    #[inline]
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::HardwareStatus { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the device reported it is locked.
    #[inline]
    #[must_use]
    pub fn is_device_locked(&self) -> bool {
        self.status_code() == Some(STATUS_DEVICE_LOCKED)
    }

    /// Returns `true` if this error is recoverable by host action.
    ///
    /// [`Error::NoPermittedDevice`] recovers after a permission flow;
    /// device status errors recover after the user unlocks or approves.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoPermittedDevice | Self::HardwareStatus { .. } | Self::Transport { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
