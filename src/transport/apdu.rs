//! APDU command and response framing.
//!
//! The signing device speaks ISO 7816-4 short APDUs over its HID
//! channel. This module builds command frames and parses response
//! frames including the trailing status word.
//!
//! # Command Frame
//!
//! ```text
//! | CLA | INS | P1 | P2 | Lc | Data |
//! |-----|-----|----|----|----|------|
//! | 1B  | 1B  | 1B | 1B | 1B | Var  |
//! ```
//!
//! # Response Frame
//!
//! ```text
//! | Data | SW1 | SW2 |
//! |------|-----|-----|
//! | Var  | 1B  | 1B  |
//! ```
//!
//! A status word of `0x9000` means success; anything else maps to
//! [`Error::HardwareStatus`] with the word preserved.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Status word indicating success.
pub const SW_OK: u16 = 0x9000;

/// Maximum data length for a short APDU.
pub const MAX_APDU_DATA: usize = 255;

/// Class byte of the signing application.
pub const CLA_SIGNER: u8 = 0xE0;

/// Class byte of the device dashboard (app name/version probe).
pub const CLA_DASHBOARD: u8 = 0xB0;

/// Instruction: derive an address and return public key + chain code.
pub const INS_GET_ADDRESS: u8 = 0x02;

/// Instruction: clear-sign a serialized transaction.
pub const INS_SIGN_TRANSACTION: u8 = 0x04;

/// Instruction: read application configuration (liveness probe).
pub const INS_GET_APP_CONFIGURATION: u8 = 0x06;

/// Instruction: sign a personal message.
pub const INS_SIGN_PERSONAL_MESSAGE: u8 = 0x08;

/// Instruction: sign a structured typed-data message.
pub const INS_SIGN_TYPED_DATA: u8 = 0x0C;

/// Instruction: dashboard app name and version.
pub const INS_GET_APP_NAME_AND_VERSION: u8 = 0x01;

/// P1 marker for the first chunk of a multi-chunk payload.
pub const P1_FIRST_CHUNK: u8 = 0x00;

/// P1 marker for continuation chunks.
pub const P1_MORE_CHUNKS: u8 = 0x80;

// ============================================================================
// Apdu
// ============================================================================

/// A short APDU command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    /// Class byte.
    pub cla: u8,
    /// Instruction byte.
    pub ins: u8,
    /// Parameter 1.
    pub p1: u8,
    /// Parameter 2.
    pub p2: u8,
    /// Command data (at most [`MAX_APDU_DATA`] bytes).
    pub data: Vec<u8>,
}

impl Apdu {
    /// Creates a new APDU command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if `data` exceeds the short-APDU limit.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self> {
        if data.len() > MAX_APDU_DATA {
            return Err(Error::transport(format!(
                "APDU data too long: {} > {MAX_APDU_DATA}",
                data.len()
            )));
        }
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Serializes the command to wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5 + self.data.len());
        bytes.push(self.cla);
        bytes.push(self.ins);
        bytes.push(self.p1);
        bytes.push(self.p2);
        bytes.push(self.data.len() as u8);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

impl fmt::Display for Apdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "apdu {:02x}:{:02x} p1={:02x} p2={:02x} lc={}",
            self.cla,
            self.ins,
            self.p1,
            self.p2,
            self.data.len()
        )
    }
}

// ============================================================================
// ApduResponse
// ============================================================================

/// A parsed APDU response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response payload, without the status word.
    data: Vec<u8>,
    /// Trailing status word (SW1 << 8 | SW2).
    status: u16,
}

impl ApduResponse {
    /// Parses a raw response frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the frame is shorter than the
    /// two-byte status word.
    pub fn parse(mut raw: Vec<u8>) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::transport(format!(
                "APDU response too short: {} bytes",
                raw.len()
            )));
        }
        let sw2 = raw.pop().unwrap_or_default();
        let sw1 = raw.pop().unwrap_or_default();
        Ok(Self {
            data: raw,
            status: u16::from_be_bytes([sw1, sw2]),
        })
    }

    /// Returns the status word.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` if the status word indicates success.
    #[inline]
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == SW_OK
    }

    /// Returns the payload if the status word indicates success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareStatus`] carrying the raw status word
    /// for any status other than [`SW_OK`].
    pub fn expect_ok(&self) -> Result<&[u8]> {
        if self.is_ok() {
            Ok(&self.data)
        } else {
            Err(Error::hardware_status(self.status))
        }
    }

    /// Consumes the response, returning the payload on success.
    ///
    /// # Errors
    ///
    /// Same as [`ApduResponse::expect_ok`].
    pub fn into_data(self) -> Result<Vec<u8>> {
        if self.is_ok() {
            Ok(self.data)
        } else {
            Err(Error::hardware_status(self.status))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
