//! BIP32 derivation path parsing and device serialization.
//!
//! Paths arrive as strings like `m/44'/60'/0'/0/0` (leading `m/`
//! optional, `'` or `h` for hardened components) and are serialized for
//! the device as a component count followed by big-endian `u32`s.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Hardened derivation flag.
const HARDENED: u32 = 0x8000_0000;

/// The device rejects paths deeper than this.
const MAX_DEPTH: usize = 10;

// ============================================================================
// Bip32Path
// ============================================================================

/// A parsed BIP32 derivation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bip32Path {
    components: Vec<u32>,
}

impl Bip32Path {
    /// Returns the raw components (hardened flag included).
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// Serializes the path for the device.
    ///
    /// Format: `[count][u32 BE]…`
    #[must_use]
    pub fn to_device_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.components.len() * 4);
        bytes.push(self.components.len() as u8);
        for component in &self.components {
            bytes.extend_from_slice(&component.to_be_bytes());
        }
        bytes
    }
}

impl FromStr for Bip32Path {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        let trimmed = path.strip_prefix("m/").unwrap_or(path);
        if trimmed.is_empty() {
            return Err(Error::validation(format!("Invalid derivation path: {path:?}")));
        }

        let mut components = Vec::new();
        for part in trimmed.split('/') {
            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h'))
            {
                Some(digits) => (digits, HARDENED),
                None => (part, 0),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| Error::validation(format!("Invalid derivation path: {path:?}")))?;
            if index >= HARDENED {
                return Err(Error::validation(format!(
                    "Derivation index out of range: {index}"
                )));
            }
            components.push(index | hardened);
        }

        if components.len() > MAX_DEPTH {
            return Err(Error::validation(format!(
                "Derivation path too deep: {} components",
                components.len()
            )));
        }

        Ok(Self { components })
    }
}

impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.components {
            if component & HARDENED != 0 {
                write!(f, "/{}'", component & !HARDENED)?;
            } else {
                write!(f, "/{component}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
