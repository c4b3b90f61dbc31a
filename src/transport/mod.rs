//! Device transport layer.
//!
//! This module owns everything that touches the physical signing
//! device: APDU framing, the platform seams supplied by the host, and
//! the [`Transport`] wrapper that serializes command exchange.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐        ┌───────────────────┐        ┌──────────┐
//! │  SessionManager  │ owns   │     Transport     │ drives │ Device   │
//! │                  │───────►│ (one per process) │───────►│ Channel  │
//! └──────────────────┘        └───────────────────┘        └──────────┘
//!                                                                ▲
//!                                              host-supplied ────┘
//!                                              DeviceBackend
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `apdu` | ISO 7816-4 command/response framing |
//! | `backend` | Platform seams: `DeviceBackend`, `DeviceChannel`, hotplug |
//! | `connection` | The owned [`Transport`] wrapper |

// ============================================================================
// Submodules
// ============================================================================

/// APDU command and response framing.
pub mod apdu;

/// Platform backend and channel traits.
pub mod backend;

/// The live device transport.
pub mod connection;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use apdu::{Apdu, ApduResponse};
pub use backend::{DeviceBackend, DeviceChannel, DeviceDescriptor, HotplugEvent, TransportKind};
pub use connection::Transport;
