use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::CosmosError;

/// Longest account payload a Cosmos SDK chain will accept.
const MAX_ACCOUNT_LEN: usize = 255;

fn validate_length(bytes: &[u8]) -> Result<(), CosmosError> {
    match bytes.len() {
        1..=MAX_ACCOUNT_LEN => Ok(()),
        n => Err(CosmosError::InvalidLength(n)),
    }
}

/// Decode a bech32 address into its lower-case prefix and account bytes.
///
/// Only the original BIP-173 checksum is accepted; bech32m strings, mixed-case
/// strings and bad checksums are rejected.
pub fn decode(address: &str) -> Result<(String, Vec<u8>), CosmosError> {
    let checked = CheckedHrpstring::new::<Bech32>(address)
        .map_err(|e| CosmosError::InvalidAddress(e.to_string()))?;

    let bytes: Vec<u8> = checked.byte_iter().collect();
    validate_length(&bytes)?;

    Ok((checked.hrp().to_lowercase(), bytes))
}

/// Decode a bech32 address and require a specific prefix.
pub fn decode_with_prefix(address: &str, prefix: &str) -> Result<Vec<u8>, CosmosError> {
    let (actual, bytes) = decode(address)?;
    if !actual.eq_ignore_ascii_case(prefix) {
        return Err(CosmosError::PrefixMismatch {
            expected: prefix.to_lowercase(),
            actual,
        });
    }
    Ok(bytes)
}

/// Encode account bytes under the given prefix.
pub fn encode(prefix: &str, bytes: &[u8]) -> Result<String, CosmosError> {
    validate_length(bytes)?;

    let hrp = Hrp::parse(&prefix.to_lowercase())
        .map_err(|e| CosmosError::InvalidPrefix(format!("{prefix}: {e}")))?;

    bech32::encode::<Bech32>(hrp, bytes).map_err(|e| CosmosError::EncodingError(e.to_string()))
}

/// Derive a Cosmos SDK account address from a 33-byte compressed secp256k1
/// public key.
///
/// The account bytes are RIPEMD-160(SHA-256(pubkey)).
pub fn pubkey_to_address(pubkey_bytes: &[u8; 33], prefix: &str) -> Result<String, CosmosError> {
    if pubkey_bytes[0] != 0x02 && pubkey_bytes[0] != 0x03 {
        return Err(CosmosError::InvalidPublicKey(
            "compressed key must start with 0x02 or 0x03".into(),
        ));
    }

    let sha = Sha256::digest(pubkey_bytes);
    let account = Ripemd160::digest(sha);

    encode(prefix, &account)
}
