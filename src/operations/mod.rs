//! High-level signing operations.
//!
//! Everything here runs on top of an established
//! [`Session`](crate::session::Session): address derivation,
//! transaction/personal/typed-data signing, and the two application
//! probes. Operations never retain the session past the call and never
//! open or close transports themselves.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `path` | BIP32 path parsing and device serialization |
//! | `resolution` | Clear-signing display heuristics |

// ============================================================================
// Submodules
// ============================================================================

/// BIP32 derivation path codec.
pub mod path;

/// Clear-signing resolution heuristics.
pub mod resolution;

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::TypedData;
use crate::session::Session;
use crate::transport::apdu::{
    Apdu, ApduResponse, CLA_DASHBOARD, CLA_SIGNER, INS_GET_ADDRESS,
    INS_GET_APP_CONFIGURATION, INS_GET_APP_NAME_AND_VERSION, INS_SIGN_PERSONAL_MESSAGE,
    INS_SIGN_TRANSACTION, INS_SIGN_TYPED_DATA, MAX_APDU_DATA, P1_FIRST_CHUNK, P1_MORE_CHUNKS,
};

use path::Bip32Path;
use resolution::ResolutionConfig;

// ============================================================================
// Result Types
// ============================================================================

/// Result of an address derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    /// Uncompressed public key, hex.
    pub public_key: String,
    /// Checksummed address, `0x`-prefixed.
    pub address: String,
    /// BIP32 chain code, hex.
    pub chain_code: String,
}

/// An ECDSA signature as returned by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Recovery byte.
    pub v: u8,
    /// `r` component, hex.
    pub r: String,
    /// `s` component, hex.
    pub s: String,
}

/// Signing application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfiguration {
    /// Whether blind signing of arbitrary data is enabled on-device.
    pub arbitrary_data_enabled: bool,
    /// Application version, `major.minor.patch`.
    pub version: String,
}

/// Name and version of the currently open device application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNameAndVersion {
    /// Application name.
    pub app_name: String,
    /// Application version string.
    pub version: String,
}

// ============================================================================
// Address Derivation
// ============================================================================

/// Derives the address, public key and chain code for a path.
///
/// # Errors
///
/// - [`Error::Validation`] for a malformed derivation path
/// - [`Error::HardwareStatus`] for any device-reported failure
/// - [`Error::Transport`] for channel or framing failures
pub async fn get_address(session: &Session, hd_path: &str) -> Result<AddressInfo> {
    let path: Bip32Path = hd_path.parse()?;
    debug!(%path, "deriving address");

    // P1=0: no on-device confirmation. P2=1: include the chain code.
    let apdu = Apdu::new(CLA_SIGNER, INS_GET_ADDRESS, 0x00, 0x01, path.to_device_bytes())?;
    let response = session.exchange(&apdu).await?;
    parse_address(response.expect_ok()?)
}

fn parse_address(data: &[u8]) -> Result<AddressInfo> {
    let (public_key, rest) = take_prefixed(data)
        .ok_or_else(|| Error::transport("address response truncated at public key"))?;
    let (address, rest) = take_prefixed(rest)
        .ok_or_else(|| Error::transport("address response truncated at address"))?;
    let chain_code = rest
        .get(..32)
        .ok_or_else(|| Error::transport("address response truncated at chain code"))?;

    let address = std::str::from_utf8(address)
        .map_err(|_| Error::transport("address is not valid ASCII"))?;
    let address = if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{address}")
    };

    Ok(AddressInfo {
        public_key: hex::encode(public_key),
        address,
        chain_code: hex::encode(chain_code),
    })
}

/// Splits one `[len][bytes…]` field off the front of `data`.
fn take_prefixed(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let length = *data.first()? as usize;
    let field = data.get(1..1 + length)?;
    Some((field, &data[1 + length..]))
}

// ============================================================================
// Transaction Signing
// ============================================================================

/// Clear-signs a serialized transaction.
///
/// The resolution flags come from
/// [`resolution::resolve`]: external plugins and ERC-20 metadata are
/// always enabled, the NFT display hint comes from the call-data
/// selector. An undecodable transaction still signs with the default
/// flags.
///
/// # Errors
///
/// - [`Error::Validation`] for a malformed path or non-hex `tx`
/// - [`Error::HardwareStatus`] / [`Error::Transport`] as usual
pub async fn sign_transaction(
    session: &Session,
    hd_path: &str,
    raw_tx_hex: &str,
) -> Result<Signature> {
    let path: Bip32Path = hd_path.parse()?;
    let raw_tx = decode_hex_param(raw_tx_hex, "tx")?;
    let config = resolution::resolve(raw_tx_hex);
    debug!(%path, flags = config.device_flags(), "clear-signing transaction");

    let response = send_chunked(
        session,
        INS_SIGN_TRANSACTION,
        config.device_flags(),
        path.to_device_bytes(),
        &raw_tx,
    )
    .await?;
    parse_signature(response.expect_ok()?)
}

// ============================================================================
// Personal Message Signing
// ============================================================================

/// Signs a personal message given as hex.
///
/// A single leading `0x` is stripped; the device expects unprefixed
/// hex.
///
/// # Errors
///
/// - [`Error::Validation`] for a malformed path or non-hex message
/// - [`Error::HardwareStatus`] / [`Error::Transport`] as usual
pub async fn sign_personal_message(
    session: &Session,
    hd_path: &str,
    message_hex: &str,
) -> Result<Signature> {
    let path: Bip32Path = hd_path.parse()?;
    let message = decode_hex_param(message_hex, "message")?;
    debug!(%path, length = message.len(), "signing personal message");

    // First chunk: path, u32-BE message length, then message bytes.
    let mut head = path.to_device_bytes();
    head.extend_from_slice(&(message.len() as u32).to_be_bytes());

    let response =
        send_chunked(session, INS_SIGN_PERSONAL_MESSAGE, 0x00, head, &message).await?;
    parse_signature(response.expect_ok()?)
}

// ============================================================================
// Typed Data Signing
// ============================================================================

/// Signs a structured typed-data message.
///
/// The full structure is forwarded for on-device rendering. There is
/// deliberately no fallback to hash-then-blind-sign for firmware that
/// cannot render it; such firmware is below the compatibility cutoff.
///
/// # Errors
///
/// - [`Error::Validation`] for a malformed path
/// - [`Error::HardwareStatus`] / [`Error::Transport`] as usual
pub async fn sign_typed_data(
    session: &Session,
    hd_path: &str,
    typed: &TypedData,
) -> Result<Signature> {
    let path: Bip32Path = hd_path.parse()?;
    let payload = serde_json::to_vec(typed)
        .map_err(|e| Error::transport(format!("failed to encode typed data: {e}")))?;
    debug!(%path, length = payload.len(), "signing typed data");

    // P2=1: full-struct rendering.
    let response = send_chunked(
        session,
        INS_SIGN_TYPED_DATA,
        0x01,
        path.to_device_bytes(),
        &payload,
    )
    .await?;
    parse_signature(response.expect_ok()?)
}

// ============================================================================
// Application Probes
// ============================================================================

/// Reads the signing application's configuration.
///
/// Cheap; also used by the session manager as its liveness probe.
pub async fn get_app_configuration(session: &Session) -> Result<AppConfiguration> {
    let apdu = Apdu::new(CLA_SIGNER, INS_GET_APP_CONFIGURATION, 0x00, 0x00, Vec::new())?;
    let response = session.exchange(&apdu).await?;
    let data = response.expect_ok()?;

    let &[flags, major, minor, patch] = data else {
        return Err(Error::transport(format!(
            "app configuration response has {} bytes, expected 4",
            data.len()
        )));
    };

    Ok(AppConfiguration {
        arbitrary_data_enabled: flags & 0x01 != 0,
        version: format!("{major}.{minor}.{patch}"),
    })
}

/// Reads the name and version of the currently open application.
///
/// This is the one operation that speaks a raw dashboard frame and
/// decodes its length-prefixed layout by hand:
/// `[format][len][name][len][version]`.
pub async fn get_app_name_and_version(session: &Session) -> Result<AppNameAndVersion> {
    let apdu = Apdu::new(
        CLA_DASHBOARD,
        INS_GET_APP_NAME_AND_VERSION,
        0x00,
        0x00,
        Vec::new(),
    )?;
    let response = session.exchange(&apdu).await?;
    let data = response.expect_ok()?;

    // Byte 0 is a format tag we do not interpret.
    let rest = data
        .get(1..)
        .ok_or_else(|| Error::transport("app name response empty"))?;
    let (name, rest) = take_prefixed(rest)
        .ok_or_else(|| Error::transport("app name response truncated at name"))?;
    let (version, _) = take_prefixed(rest)
        .ok_or_else(|| Error::transport("app name response truncated at version"))?;

    Ok(AppNameAndVersion {
        app_name: ascii_field(name, "app name")?,
        version: ascii_field(version, "app version")?,
    })
}

fn ascii_field(bytes: &[u8], what: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::transport(format!("{what} is not valid ASCII")))
}

// ============================================================================
// Helpers
// ============================================================================

/// Strips a single leading `0x` and decodes the remaining hex.
fn decode_hex_param(value: &str, name: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped)
        .map_err(|_| Error::validation(format!("Invalid {name} parameter: not a hex string")))
}

/// Sends `head + body` as a chunked command sequence.
///
/// The first chunk carries P1=0x00, continuations P1=0x80; every chunk
/// but the last must answer with a bare OK. The final response carries
/// the operation result.
async fn send_chunked(
    session: &Session,
    ins: u8,
    p2: u8,
    head: Vec<u8>,
    body: &[u8],
) -> Result<ApduResponse> {
    let mut payload = head;
    payload.extend_from_slice(body);

    let mut chunks = payload.chunks(MAX_APDU_DATA).peekable();
    let mut p1 = P1_FIRST_CHUNK;
    loop {
        let chunk = chunks.next().unwrap_or_default();
        let apdu = Apdu::new(CLA_SIGNER, ins, p1, p2, chunk.to_vec())?;
        let response = session.exchange(&apdu).await?;
        if chunks.peek().is_none() {
            return Ok(response);
        }
        // Intermediate chunks must individually succeed.
        response.expect_ok()?;
        p1 = P1_MORE_CHUNKS;
    }
}

fn parse_signature(data: &[u8]) -> Result<Signature> {
    if data.len() < 65 {
        return Err(Error::transport(format!(
            "signature response has {} bytes, expected 65",
            data.len()
        )));
    }
    Ok(Signature {
        v: data[0],
        r: hex::encode(&data[1..33]),
        s: hex::encode(&data[33..65]),
    })
}

// ============================================================================
// Tests
// ============================================================================
