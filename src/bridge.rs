//! Top-level bridge facade.
//!
//! [`Bridge`] wires the session manager, the device watcher, and the
//! RPC dispatcher together behind one handle. Hosts construct it with
//! [`Bridge::builder`], call [`Bridge::start`] once, then feed every
//! inbound envelope to [`Bridge::handle_message`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use signer_bridge::{Bridge, DeviceBackend};
//!
//! # async fn run(backend: Arc<dyn DeviceBackend>) -> anyhow::Result<()> {
//! let (bridge, mut presence) = Bridge::builder(backend).build();
//! bridge.start().await;
//!
//! tokio::spawn(async move {
//!     while let Some(notification) = presence.recv().await {
//!         println!("device present: {}", notification.present);
//!     }
//! });
//!
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

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::dispatcher::{DEFAULT_TARGET, RpcDispatcher};
use crate::identifiers::VendorId;
use crate::protocol::{ActionResponse, PresenceNotification};
use crate::session::SessionManager;
use crate::transport::DeviceBackend;
use crate::watcher::DeviceWatcher;

// ============================================================================
// Constants
// ============================================================================

/// Vendor id of the supported signing devices.
pub const DEFAULT_VENDOR_ID: VendorId = VendorId::new(0x2c97);

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Configures and assembles a [`Bridge`].
pub struct BridgeBuilder {
    backend: Arc<dyn DeviceBackend>,
    vendor_id: VendorId,
    target: String,
}

impl BridgeBuilder {
    /// Restricts the bridge to devices from `vendor_id`.
    ///
    /// Defaults to [`DEFAULT_VENDOR_ID`].
    #[must_use]
    pub fn vendor_id(mut self, vendor_id: VendorId) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    /// Overrides the envelope target the bridge claims.
    ///
    /// Defaults to [`DEFAULT_TARGET`].
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Assembles the bridge and its presence notification stream.
    #[must_use]
    pub fn build(self) -> (Bridge, mpsc::UnboundedReceiver<PresenceNotification>) {
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&self.backend),
            self.vendor_id,
        ));
        let (notifications, receiver) = mpsc::unbounded_channel();
        let watcher = DeviceWatcher::new(
            Arc::clone(&self.backend),
            Arc::clone(&sessions),
            self.vendor_id,
            notifications,
        );
        let dispatcher = RpcDispatcher::new(Arc::clone(&sessions), self.target);

        (
            Bridge {
                sessions,
                watcher,
                dispatcher,
            },
            receiver,
        )
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Hardware signing bridge.
///
/// One instance serves one host page or process. Cloneless by design;
/// wrap in an `Arc` to share across tasks.
pub struct Bridge {
    sessions: Arc<SessionManager>,
    watcher: DeviceWatcher,
    dispatcher: RpcDispatcher,
}

impl Bridge {
    /// Starts building a bridge over `backend`.
    #[must_use]
    pub fn builder(backend: Arc<dyn DeviceBackend>) -> BridgeBuilder {
        BridgeBuilder {
            backend,
            vendor_id: DEFAULT_VENDOR_ID,
            target: DEFAULT_TARGET.to_owned(),
        }
    }

    /// Begins watching for device arrival and removal.
    ///
    /// Emits an initial presence notification when an authorized
    /// device is already attached, then keeps the stream current from
    /// hotplug events. Call once after [`BridgeBuilder::build`].
    pub async fn start(&self) {
        self.watcher.start();
        self.watcher.probe_initial_presence().await;
    }

    /// Handles one inbound envelope.
    ///
    /// Returns `None` when the envelope is addressed to another
    /// consumer of the shared channel.
    pub async fn handle_message(&self, message: &Value) -> Option<ActionResponse> {
        self.dispatcher.handle_message(message).await
    }

    /// Whether a device session is currently open.
    #[inline]
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.sessions.has_session()
    }

    /// Closes any open device session.
    pub async fn teardown(&self) {
        self.sessions.teardown().await;
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("target", &self.dispatcher.target())
            .field("has_session", &self.has_session())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::transport::HotplugEvent;
    use crate::transport::mock::MockBackend;

    #[tokio::test]
    async fn test_default_configuration() {
        let backend = Arc::new(MockBackend::with_default_device());
        let (bridge, _presence) = Bridge::builder(backend).build();

        assert_eq!(bridge.dispatcher.target(), DEFAULT_TARGET);
        assert!(!bridge.has_session());
    }

    #[tokio::test]
    async fn test_custom_target_routing() {
        let backend = Arc::new(MockBackend::with_default_device());
        let (bridge, _presence) = Bridge::builder(backend).target("wallet-bridge").build();

        let wrong = json!({ "target": "signer-bridge", "action": "makeSession" });
        assert!(bridge.handle_message(&wrong).await.is_none());

        let right = json!({ "target": "wallet-bridge", "action": "makeSession" });
        let response = bridge.handle_message(&right).await.expect("handled");
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_start_reports_attached_device() {
        let backend = Arc::new(MockBackend::with_default_device());
        let (bridge, mut presence) = Bridge::builder(backend).build();

        bridge.start().await;

        let notification = presence.recv().await.expect("notification");
        assert!(notification.present);
    }

    #[tokio::test]
    async fn test_hotplug_flows_through_facade() {
        let backend = Arc::new(MockBackend::new());
        let sender = backend.hotplug_sender();
        let (bridge, mut presence) = Bridge::builder(Arc::clone(&backend) as _).build();

        bridge.start().await;

        let descriptor = crate::transport::DeviceDescriptor::new(
            MockBackend::VENDOR,
            crate::identifiers::ProductId::new(0x4011),
        );
        sender
            .send(HotplugEvent::Connected(descriptor))
            .expect("send");

        let notification = presence.recv().await.expect("notification");
        assert!(notification.present);
    }

    #[tokio::test]
    async fn test_vendor_override() {
        let backend = Arc::new(MockBackend::with_default_device());
        let (bridge, _presence) = Bridge::builder(backend)
            .vendor_id(VendorId::new(0x1209))
            .build();

        // The attached device carries the default vendor id, which the
        // overridden bridge does not trust.
        let request = json!({ "target": DEFAULT_TARGET, "action": "makeSession" });
        let response = bridge.handle_message(&request).await.expect("handled");
        assert!(!response.success);
        assert_eq!(
            response.error().expect("error").name.as_deref(),
            Some("NoPermittedDevice")
        );
    }
}
