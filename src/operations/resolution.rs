//! Clear-signing resolution heuristics.
//!
//! Before a transaction is clear-signed, the bridge inspects its call
//! data to pick display capabilities for the device confirmation
//! screen. The heuristic is advisory only: any decode failure falls
//! back to the default flags and must never block signing.
//!
//! The inspection needs just enough RLP to reach the call-data field
//! of the three transaction encodings in circulation; the walker here
//! is deliberately minimal and total.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// `approve(address,uint256)`, shared by fungible and non-fungible
/// approval patterns, so it carries no NFT signal.
pub const SELECTOR_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// `setApprovalForAll(address,bool)`, a collection-wide operator
/// grant, rendered with NFT semantics on-device.
pub const SELECTOR_SET_APPROVAL_FOR_ALL: [u8; 4] = [0xa2, 0x2c, 0xb4, 0x65];

/// Call-data field position in a legacy transaction list.
const LEGACY_DATA_FIELD: usize = 5;

/// Call-data field position in an EIP-2930 (type 1) transaction list.
const EIP2930_DATA_FIELD: usize = 6;

/// Call-data field position in an EIP-1559/4844 (type 2/3) list.
const EIP1559_DATA_FIELD: usize = 7;

// ============================================================================
// ResolutionConfig
// ============================================================================

/// Capability flags sent with a clear-sign request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionConfig {
    /// Allow external plugin resolution on-device.
    pub external_plugins: bool,
    /// Allow fungible-token metadata resolution.
    pub erc20: bool,
    /// Render the confirmation with NFT semantics.
    pub nft: bool,
}

impl Default for ResolutionConfig {
    /// External plugins and ERC-20 resolution are always requested;
    /// the NFT hint defaults to off.
    fn default() -> Self {
        Self {
            external_plugins: true,
            erc20: true,
            nft: false,
        }
    }
}

impl ResolutionConfig {
    /// Packs the flags into the P2 byte of the sign command.
    #[inline]
    #[must_use]
    pub const fn device_flags(self) -> u8 {
        (self.external_plugins as u8) | (self.erc20 as u8) << 1 | (self.nft as u8) << 2
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Classifies a function selector into display capabilities.
///
/// Total: unknown selectors yield the default flags.
#[must_use]
pub fn classify(selector: [u8; 4]) -> ResolutionConfig {
    ResolutionConfig {
        nft: selector == SELECTOR_SET_APPROVAL_FOR_ALL,
        ..ResolutionConfig::default()
    }
}

/// Derives resolution flags from a raw transaction hex string.
///
/// Total: undecodable input (bad hex, foreign encoding, short call
/// data) yields the default flags. The heuristic only improves the
/// device display; it never fails the signing request.
#[must_use]
pub fn resolve(raw_tx_hex: &str) -> ResolutionConfig {
    let stripped = raw_tx_hex.strip_prefix("0x").unwrap_or(raw_tx_hex);
    let Ok(raw) = hex::decode(stripped) else {
        debug!("transaction hex undecodable; using default resolution flags");
        return ResolutionConfig::default();
    };

    match extract_call_data(&raw) {
        Some(data) if data.len() >= 4 => {
            let selector = [data[0], data[1], data[2], data[3]];
            classify(selector)
        }
        _ => {
            debug!("no call data recovered; using default resolution flags");
            ResolutionConfig::default()
        }
    }
}

// ============================================================================
// RLP Walker
// ============================================================================

/// Extracts the call-data field from a serialized transaction.
///
/// Supports legacy, EIP-2930 (`0x01`), EIP-1559 (`0x02`) and EIP-4844
/// (`0x03`) envelopes. Any structural surprise returns `None`.
fn extract_call_data(raw: &[u8]) -> Option<Vec<u8>> {
    let (payload, data_field) = match raw.first()? {
        0x01 => (raw.get(1..)?, EIP2930_DATA_FIELD),
        0x02 | 0x03 => (raw.get(1..)?, EIP1559_DATA_FIELD),
        byte if *byte >= 0xc0 => (raw, LEGACY_DATA_FIELD),
        _ => return None,
    };

    let (is_list, offset, length) = rlp_header(payload)?;
    if !is_list {
        return None;
    }
    let mut cursor = payload.get(offset..offset + length)?;

    for field in 0.. {
        let (item_is_list, item_offset, item_length) = rlp_header(cursor)?;
        let item = cursor.get(item_offset..item_offset + item_length)?;
        if field == data_field {
            if item_is_list {
                return None;
            }
            return Some(item.to_vec());
        }
        cursor = cursor.get(item_offset + item_length..)?;
    }
    None
}

/// Decodes one RLP item header.
///
/// Returns `(is_list, payload_offset, payload_length)`, or `None` for
/// any truncated or oversized encoding.
fn rlp_header(buf: &[u8]) -> Option<(bool, usize, usize)> {
    let first = *buf.first()?;
    match first {
        // Single byte encodes itself.
        0x00..=0x7f => Some((false, 0, 1)),
        // Short string.
        0x80..=0xb7 => check_bounds(buf, false, 1, (first - 0x80) as usize),
        // Long string.
        0xb8..=0xbf => {
            let (offset, length) = long_length(buf, (first - 0xb7) as usize)?;
            check_bounds(buf, false, offset, length)
        }
        // Short list.
        0xc0..=0xf7 => check_bounds(buf, true, 1, (first - 0xc0) as usize),
        // Long list.
        0xf8..=0xff => {
            let (offset, length) = long_length(buf, (first - 0xf7) as usize)?;
            check_bounds(buf, true, offset, length)
        }
    }
}

/// Reads a big-endian length of `length_bytes` bytes after the tag.
fn long_length(buf: &[u8], length_bytes: usize) -> Option<(usize, usize)> {
    let digits = buf.get(1..1 + length_bytes)?;
    let mut length: usize = 0;
    for digit in digits {
        length = length.checked_mul(256)?.checked_add(*digit as usize)?;
    }
    Some((1 + length_bytes, length))
}

fn check_bounds(
    buf: &[u8],
    is_list: bool,
    offset: usize,
    length: usize,
) -> Option<(bool, usize, usize)> {
    if offset.checked_add(length)? <= buf.len() {
        Some((is_list, offset, length))
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Minimal RLP encoder, enough to build test transactions.
    fn rlp_bytes(data: &[u8]) -> Vec<u8> {
        match data {
            [byte] if *byte < 0x80 => vec![*byte],
            _ if data.len() <= 55 => {
                let mut out = vec![0x80 + data.len() as u8];
                out.extend_from_slice(data);
                out
            }
            _ => {
                let length = (data.len() as u16).to_be_bytes();
                let mut out = vec![0xb7 + 2, length[0], length[1]];
                out.extend_from_slice(data);
                out
            }
        }
    }

    fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
        let payload: Vec<u8> = items.concat();
        if payload.len() <= 55 {
            let mut out = vec![0xc0 + payload.len() as u8];
            out.extend(payload);
            out
        } else {
            let length = (payload.len() as u16).to_be_bytes();
            let mut out = vec![0xf7 + 2, length[0], length[1]];
            out.extend(payload);
            out
        }
    }

    fn legacy_tx(call_data: &[u8]) -> String {
        let fields = vec![
            rlp_bytes(&[0x01]),        // nonce
            rlp_bytes(&[0x04, 0xa8]),  // gas price
            rlp_bytes(&[0x52, 0x08]),  // gas limit
            rlp_bytes(&[0xaa; 20]),    // to
            rlp_bytes(&[]),            // value
            rlp_bytes(call_data),      // data
            rlp_bytes(&[0x1b]),        // v
            rlp_bytes(&[0x11; 32]),    // r
            rlp_bytes(&[0x22; 32]),    // s
        ];
        hex::encode(rlp_list(&fields))
    }

    fn eip1559_tx(call_data: &[u8]) -> String {
        let fields = vec![
            rlp_bytes(&[0x01]),       // chain id
            rlp_bytes(&[0x02]),       // nonce
            rlp_bytes(&[0x03]),       // max priority fee
            rlp_bytes(&[0x04]),       // max fee
            rlp_bytes(&[0x52, 0x08]), // gas limit
            rlp_bytes(&[0xbb; 20]),   // to
            rlp_bytes(&[]),           // value
            rlp_bytes(call_data),     // data
            rlp_list(&[]),            // access list
        ];
        let mut raw = vec![0x02];
        raw.extend(rlp_list(&fields));
        hex::encode(raw)
    }

    fn with_selector(selector: [u8; 4]) -> Vec<u8> {
        let mut data = selector.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        data
    }

    #[test]
    fn test_classify_approve_not_nft() {
        let config = classify(SELECTOR_APPROVE);
        assert!(!config.nft);
        assert!(config.erc20);
        assert!(config.external_plugins);
    }

    #[test]
    fn test_classify_set_approval_for_all_is_nft() {
        let config = classify(SELECTOR_SET_APPROVAL_FOR_ALL);
        assert!(config.nft);
        assert!(config.erc20);
        assert!(config.external_plugins);
    }

    #[test]
    fn test_classify_unknown_selector() {
        let config = classify([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(config, ResolutionConfig::default());
    }

    #[test]
    fn test_resolve_legacy_approve() {
        let tx = legacy_tx(&with_selector(SELECTOR_APPROVE));
        assert!(!resolve(&tx).nft);
    }

    #[test]
    fn test_resolve_legacy_set_approval_for_all() {
        let tx = legacy_tx(&with_selector(SELECTOR_SET_APPROVAL_FOR_ALL));
        assert!(resolve(&tx).nft);
    }

    #[test]
    fn test_resolve_eip1559() {
        let tx = eip1559_tx(&with_selector(SELECTOR_SET_APPROVAL_FOR_ALL));
        assert!(resolve(&tx).nft);

        let tx = eip1559_tx(&with_selector(SELECTOR_APPROVE));
        assert!(!resolve(&tx).nft);
    }

    #[test]
    fn test_resolve_accepts_0x_prefix() {
        let tx = format!("0x{}", legacy_tx(&with_selector(SELECTOR_SET_APPROVAL_FOR_ALL)));
        assert!(resolve(&tx).nft);
    }

    #[test]
    fn test_resolve_undecodable_uses_defaults() {
        assert_eq!(resolve("not hex at all"), ResolutionConfig::default());
        assert_eq!(resolve(""), ResolutionConfig::default());
        assert_eq!(resolve("0xdeadbeef"), ResolutionConfig::default());
    }

    #[test]
    fn test_resolve_short_call_data_uses_defaults() {
        let tx = legacy_tx(&[0x01, 0x02]);
        assert_eq!(resolve(&tx), ResolutionConfig::default());
    }

    #[test]
    fn test_extract_rejects_truncated_list() {
        // Claims 40 payload bytes but carries none.
        assert_eq!(extract_call_data(&[0xe8]), None);
    }

    #[test]
    fn test_device_flags_bits() {
        assert_eq!(ResolutionConfig::default().device_flags(), 0b011);
        let nft = ResolutionConfig {
            nft: true,
            ..ResolutionConfig::default()
        };
        assert_eq!(nft.device_flags(), 0b111);
    }

    proptest! {
        #[test]
        fn prop_resolve_never_panics(input in ".*") {
            let _ = resolve(&input);
        }

        #[test]
        fn prop_extract_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = extract_call_data(&raw);
        }

        #[test]
        fn prop_classify_total(selector in any::<[u8; 4]>()) {
            let config = classify(selector);
            prop_assert!(config.erc20);
            prop_assert!(config.external_plugins);
        }
    }
}
