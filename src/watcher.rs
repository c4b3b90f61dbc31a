//! Device presence watcher.
//!
//! Subscribes to platform hotplug notifications, filters them by the
//! configured vendor id, and reports presence changes to the host as
//! fire-and-forget [`PresenceNotification`]s. On removal of a matching
//! device it also force-clears any live transport, best-effort.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::identifiers::VendorId;
use crate::protocol::PresenceNotification;
use crate::session::SessionManager;
use crate::transport::{DeviceBackend, HotplugEvent};

// ============================================================================
// DeviceWatcher
// ============================================================================

/// Watches for connect/disconnect of the target device class.
pub struct DeviceWatcher {
    backend: Arc<dyn DeviceBackend>,
    sessions: Arc<SessionManager>,
    vendor_id: VendorId,
    notifications: mpsc::UnboundedSender<PresenceNotification>,
}

impl DeviceWatcher {
    /// Creates a watcher reporting into `notifications`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn DeviceBackend>,
        sessions: Arc<SessionManager>,
        vendor_id: VendorId,
        notifications: mpsc::UnboundedSender<PresenceNotification>,
    ) -> Self {
        Self {
            backend,
            sessions,
            vendor_id,
            notifications,
        }
    }

    /// Starts consuming hotplug events on a background task.
    ///
    /// If the platform has no hotplug API this is a no-op: the bridge
    /// degrades to manual connect on demand, which is a warning, not
    /// an error.
    pub fn start(&self) {
        let Some(mut events) = self.backend.subscribe() else {
            warn!("hotplug notifications unavailable; degrading to manual connect on demand");
            return;
        };

        let sessions = Arc::clone(&self.sessions);
        let vendor_id = self.vendor_id;
        let notifications = self.notifications.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event.descriptor().vendor_id != vendor_id {
                    trace!(
                        vendor = %event.descriptor().vendor_id,
                        "ignoring hotplug event from foreign vendor"
                    );
                    continue;
                }
                match event {
                    HotplugEvent::Connected(descriptor) => {
                        debug!(device = %descriptor.product_id, "device connected");
                        let _ = notifications.send(PresenceNotification::new(true));
                    }
                    HotplugEvent::Disconnected(descriptor) => {
                        debug!(device = %descriptor.product_id, "device disconnected");
                        // Clear the dead transport before telling the
                        // host the device is gone.
                        sessions.teardown().await;
                        let _ = notifications.send(PresenceNotification::new(false));
                    }
                }
            }
            debug!("hotplug event stream ended");
        });
    }

    /// Reports presence once at startup if a matching device is
    /// already authorized.
    ///
    /// Probe failures are logged and treated as "no device present".
    pub async fn probe_initial_presence(&self) {
        match self.backend.authorized_devices().await {
            Ok(devices) => {
                if devices
                    .iter()
                    .any(|descriptor| descriptor.vendor_id == self.vendor_id)
                {
                    debug!("matching device already authorized at startup");
                    let _ = self.notifications.send(PresenceNotification::new(true));
                }
            }
            Err(e) => {
                warn!(error = %e, "initial presence probe failed; assuming no device");
            }
        }
    }
}

impl std::fmt::Debug for DeviceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceWatcher")
            .field("vendor_id", &self.vendor_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
