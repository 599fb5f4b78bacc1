//! Pure input validators. None of these ever panic or return errors.

use alloy_signer_local::PrivateKeySigner;

/// `true` iff `address` is `0x` followed by exactly 40 hex digits.
/// Checksum casing is not enforced.
pub fn validate_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// `true` iff `amount` parses to a finite number greater than zero.
pub fn validate_amount(amount: &str) -> bool {
    amount
        .trim()
        .parse::<f64>()
        .map(|v| v.is_finite() && v > 0.0)
        .unwrap_or(false)
}

/// `true` iff `key` is a 32-byte hex secp256k1 scalar (with or without
/// `0x`).
pub fn validate_private_key(key: &str) -> bool {
    let hex = key.trim().strip_prefix("0x").unwrap_or(key.trim());
    hex.len() == 64
        && hex.bytes().all(|b| b.is_ascii_hexdigit())
        && hex.parse::<PrivateKeySigner>().is_ok()
}

/// `true` iff `hash` is a `0x`-prefixed 32-byte hex transaction hash.
pub fn validate_tx_hash(hash: &str) -> bool {
    match hash.strip_prefix("0x") {
        Some(hex) => hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
