//! Platform seams: device backend and device channel traits.
//!
//! The bridge runs inside an isolated context and never links a
//! platform HID library itself. The host supplies a [`DeviceBackend`]
//! (WebHID bindings, hidapi, a simulator) and the bridge drives it
//! through these object-safe async traits.
//!
//! # Ownership
//!
//! A [`DeviceChannel`] returned by the backend is exclusively owned by
//! the [`Transport`](super::Transport) that wraps it. The backend keeps
//! no reference to opened channels.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::identifiers::{ProductId, VendorId};

// ============================================================================
// DeviceDescriptor
// ============================================================================

/// Transient description of a device seen by the platform.
///
/// Delivered by hotplug events and device enumeration; never persisted.
/// Only the vendor id participates in filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    /// USB vendor identifier.
    pub vendor_id: VendorId,
    /// USB product identifier.
    pub product_id: ProductId,
    /// Human-readable product name, if the platform exposes one.
    #[serde(default)]
    pub product_name: Option<String>,
}

impl DeviceDescriptor {
    /// Creates a descriptor without a product name.
    #[inline]
    #[must_use]
    pub const fn new(vendor_id: VendorId, product_id: ProductId) -> Self {
        Self {
            vendor_id,
            product_id,
            product_name: None,
        }
    }

    /// Sets the product name.
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }
}

// ============================================================================
// HotplugEvent
// ============================================================================

/// A connect/disconnect notification from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    /// A device was plugged in or became visible.
    Connected(DeviceDescriptor),
    /// A device was unplugged or revoked.
    Disconnected(DeviceDescriptor),
}

impl HotplugEvent {
    /// Returns the descriptor carried by the event.
    #[inline]
    #[must_use]
    pub const fn descriptor(&self) -> &DeviceDescriptor {
        match self {
            Self::Connected(descriptor) | Self::Disconnected(descriptor) => descriptor,
        }
    }
}

// ============================================================================
// TransportKind
// ============================================================================

/// Preferred physical transport, selectable via the `updateTransport`
/// RPC action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Native HID (default).
    #[default]
    Hid,
    /// Browser WebHID.
    WebHid,
    /// Bluetooth Low Energy.
    Ble,
}

impl TransportKind {
    /// Parses a transport kind from its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hid" => Some(Self::Hid),
            "webhid" => Some(Self::WebHid),
            "ble" => Some(Self::Ble),
            _ => None,
        }
    }
}

// ============================================================================
// DeviceChannel
// ============================================================================

/// One open bidirectional channel to a device.
///
/// Implementations frame the APDU bytes for their medium (HID reports,
/// WebHID, BLE characteristics) and return the raw response frame
/// including the status word.
#[async_trait]
pub trait DeviceChannel: Send {
    /// Sends one command frame and awaits its response frame.
    async fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>>;

    /// Closes the channel, releasing the underlying device handle.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// DeviceBackend
// ============================================================================

/// Platform capability surface supplied by the host.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Returns `true` if this platform can open hardware transports
    /// at all.
    fn is_supported(&self) -> bool;

    /// Lists devices the platform already authorized for this origin.
    ///
    /// No user gesture is required; authorization happened out of band.
    async fn authorized_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Opens the connection the platform remembers as already
    /// connected, if any.
    ///
    /// Returns `Ok(None)` when nothing is remembered; that is not an
    /// error and callers fall back to enumeration.
    async fn open_remembered(&self, kind: TransportKind) -> Result<Option<Box<dyn DeviceChannel>>>;

    /// Opens a fresh channel to an already-authorized device.
    async fn open(
        &self,
        descriptor: &DeviceDescriptor,
        kind: TransportKind,
    ) -> Result<Box<dyn DeviceChannel>>;

    /// Subscribes to hotplug notifications.
    ///
    /// Returns `None` when the platform has no hotplug API; the bridge
    /// then degrades to manual connect on demand.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HotplugEvent>>;
}

// ============================================================================
// Tests
// ============================================================================
