//! Type-safe identifiers for USB/HID device matching.
//!
//! Newtype wrappers prevent mixing vendor and product identifiers
//! at compile time. Both are plain 16-bit USB descriptor fields.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// VendorId
// ============================================================================

/// USB vendor identifier.
///
/// The bridge filters every hotplug event and device enumeration by
/// this value; devices from other vendors are invisible to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(u16);

impl VendorId {
    /// Creates a vendor id from a raw USB descriptor value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw 16-bit value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

// ============================================================================
// ProductId
// ============================================================================

/// USB product identifier.
///
/// Carried in [`DeviceDescriptor`](crate::transport::DeviceDescriptor) for
/// logging; the bridge never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u16);

impl ProductId {
    /// Creates a product id from a raw USB descriptor value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw 16-bit value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_id_display() {
        assert_eq!(VendorId::new(0x2c97).to_string(), "0x2c97");
        assert_eq!(VendorId::new(0x1050).to_string(), "0x1050");
    }

    #[test]
    fn test_vendor_id_equality() {
        assert_eq!(VendorId::new(0x2c97), VendorId::new(0x2c97));
        assert_ne!(VendorId::new(0x2c97), VendorId::new(0x1050));
    }

    #[test]
    fn test_product_id_roundtrip() {
        let id = ProductId::new(0x4011);
        assert_eq!(id.as_u16(), 0x4011);
        assert_eq!(id.to_string(), "0x4011");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&VendorId::new(0x2c97)).expect("serialize");
        assert_eq!(json, "11415");

        let back: VendorId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, VendorId::new(0x2c97));
    }
}
