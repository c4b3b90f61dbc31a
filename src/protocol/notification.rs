//! Outbound hotplug notifications.
//!
//! Fire-and-forget messages toward the host application; the bridge
//! never waits for an acknowledgement.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// PresenceNotification
// ============================================================================

/// Device presence changed.
///
/// Sent whenever a matching-vendor device connects or disconnects, and
/// once at startup if a device is already authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceNotification {
    /// Event discriminator, always `deviceConnectionChanged`.
    pub event: PresenceEvent,

    /// Whether a matching device is now present.
    pub present: bool,
}

impl PresenceNotification {
    /// Creates a presence notification.
    #[inline]
    #[must_use]
    pub const fn new(present: bool) -> Self {
        Self {
            event: PresenceEvent::DeviceConnectionChanged,
            present,
        }
    }
}

/// Discriminator for presence notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceEvent {
    /// A matching-vendor device connected or disconnected.
    #[serde(rename = "deviceConnectionChanged")]
    DeviceConnectionChanged,
}

// ============================================================================
// Tests
// ============================================================================
