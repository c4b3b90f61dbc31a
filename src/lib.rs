//! Signer Bridge - Hardware signing device bridge library.
//!
//! This library brokers between host applications and a USB/HID
//! hardware signing device, exposing key derivation and transaction
//! signing over a small JSON-RPC style envelope protocol.
//!
//! # Architecture
//!
//! The bridge follows a request/response model over a shared channel:
//!
//! - **Host side**: Sends action envelopes, receives responses and
//!   presence notifications
//! - **Device side**: APDU exchanges over a platform HID backend
//!
//! Key design principles:
//!
//! - Sessions are ephemeral: every request opens the device, runs one
//!   operation, and tears the transport down
//! - Concurrent requests share one establishment attempt (single
//!   flight) instead of racing for the device
//! - Parameters are validated before any device I/O
//! - The platform HID stack sits behind the [`DeviceBackend`] trait;
//!   hosts plug in WebHID, hidapi, or a test double
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use signer_bridge::{Bridge, DeviceBackend};
//!
//! # async fn run(backend: Arc<dyn DeviceBackend>) -> anyhow::Result<()> {
//! // Assemble the bridge over a platform HID backend
//! let (bridge, mut presence) = Bridge::builder(backend).build();
//! bridge.start().await;
//!
//! // Presence notifications stream as devices come and go
//! tokio::spawn(async move {
//!     while let Some(n) = presence.recv().await {
//!         println!("device present: {}", n.present);
//!     }
//! });
//!
//! // Feed every inbound envelope through the bridge
//! let request = json!({
//!     "target": "signer-bridge",
//!     "action": "getPublicKey",
//!     "params": { "hdPath": "m/44'/60'/0'/0/0" },
//! });
//! if let Some(response) = bridge.handle_message(&request).await {
//!     println!("success: {}", response.success);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Top-level facade: [`Bridge`] and its builder |
//! | [`dispatcher`] | Envelope routing and per-action validation |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe vendor/product id wrappers |
//! | [`operations`] | Device operations: addresses, signing, probes |
//! | [`protocol`] | Envelope and notification wire types |
//! | [`session`] | Single-flight session lifecycle |
//! | [`transport`] | APDU framing and the device channel seam |
//! | [`watcher`] | Hotplug presence tracking |

// ============================================================================
// Modules
// ============================================================================

/// Top-level facade wiring sessions, watcher, and dispatcher together.
///
/// Use [`Bridge::builder()`] to create a configured bridge instance.
pub mod bridge;

/// Envelope routing.
///
/// [`RpcDispatcher`] claims envelopes addressed to the bridge target
/// and turns them into exactly one response each.
pub mod dispatcher;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for USB devices.
///
/// Newtype wrappers prevent mixing vendor and product ids at compile
/// time.
pub mod identifiers;

/// Device operations.
///
/// Address derivation, transaction/message/typed-data signing, and the
/// app liveness probes, all expressed as APDU exchanges.
pub mod operations;

/// Envelope and notification wire types.
///
/// Request parsing, response serialization, and presence
/// notifications.
pub mod protocol;

/// Session lifecycle.
///
/// [`SessionManager`] owns the open-probe-reuse-teardown cycle and
/// collapses concurrent establishment into a single flight.
pub mod session;

/// APDU framing and the device channel seam.
///
/// Internal wire format plus the [`DeviceBackend`] / `DeviceChannel`
/// traits the host platform implements.
pub mod transport;

/// Hotplug presence tracking.
///
/// [`DeviceWatcher`] mirrors device arrival and removal into presence
/// notifications and tears down sessions on unplug.
pub mod watcher;

// ============================================================================
// Re-exports
// ============================================================================

// Facade types
pub use bridge::{Bridge, BridgeBuilder, DEFAULT_VENDOR_ID};

// Dispatcher types
pub use dispatcher::{DEFAULT_TARGET, RpcDispatcher};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ProductId, VendorId};

// Operation result types
pub use operations::{AddressInfo, AppConfiguration, AppNameAndVersion, Signature};

// Protocol types
pub use protocol::{ActionResponse, PresenceNotification, SerializedError, TypedData};

// Session types
pub use session::SessionManager;

// Transport types
pub use transport::{DeviceBackend, DeviceChannel, DeviceDescriptor, HotplugEvent, TransportKind};

// Watcher types
pub use watcher::DeviceWatcher;
