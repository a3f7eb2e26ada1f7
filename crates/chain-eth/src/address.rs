use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Length of an EVM account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Derives the 20-byte account of a secp256k1 verifying key.
///
/// Keccak-256 over the 64-byte uncompressed key (without the 0x04 tag); the
/// last 20 bytes are the account.
pub fn verifying_key_to_bytes(key: &VerifyingKey) -> [u8; ADDRESS_LEN] {
    let uncompressed = key.to_encoded_point(false);
    let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);

    let mut account = [0u8; ADDRESS_LEN];
    account.copy_from_slice(&hash[12..]);
    account
}

/// Renders account bytes as an EIP-55 mixed-case `0x` address.
pub fn to_checksum_address(bytes: &[u8; ADDRESS_LEN]) -> String {
    let lower = hex::encode(bytes);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut checksummed = String::with_capacity(2 + 2 * ADDRESS_LEN);
    checksummed.push_str("0x");

    for (i, c) in lower.chars().enumerate() {
        // Nibble i of the hash decides the case of hex character i.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

/// Strips the `0x` prefix and checks the hex body length and alphabet.
fn hex_body(address: &str) -> Result<&str, EthError> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if body.len() != 2 * ADDRESS_LEN {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            body.len()
        )));
    }

    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    Ok(body)
}

/// Parses a `0x` address into account bytes.
///
/// All-lowercase and all-uppercase bodies carry no checksum and are accepted
/// as-is; mixed-case bodies must match their EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<[u8; ADDRESS_LEN], EthError> {
    let body = hex_body(address)?;

    let mut bytes = [0u8; ADDRESS_LEN];
    hex::decode_to_slice(body, &mut bytes)
        .map_err(|e| EthError::InvalidAddress(e.to_string()))?;

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&bytes)[2..] != *body {
        return Err(EthError::InvalidAddress("EIP-55 checksum mismatch".into()));
    }

    Ok(bytes)
}
