//! RPC envelope and notification types.
//!
//! The host application talks to the bridge through JSON envelopes on
//! a shared message channel. This module defines both directions:
//! inbound [`ActionRequest`] envelopes, outbound [`ActionResponse`]
//! replies, and the fire-and-forget [`PresenceNotification`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `request` | Inbound envelope, action names, param validation |
//! | `response` | Response wrapper and error serialization |
//! | `notification` | Hotplug presence notifications |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound RPC envelope types.
pub mod request;

/// Outbound RPC response types.
pub mod response;

/// Outbound hotplug notifications.
pub mod notification;

// ============================================================================
// Re-exports
// ============================================================================

pub use notification::{PresenceEvent, PresenceNotification};
pub use request::{ActionKind, ActionRequest, Params, TypedData};
pub use response::{ActionResponse, SerializedError};
