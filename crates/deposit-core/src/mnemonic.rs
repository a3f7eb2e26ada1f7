use bip39::{Language, Mnemonic};
use zeroize::Zeroizing;

use crate::error::DepositError;

/// Length of a BIP-39 seed.
pub const SEED_LEN: usize = 64;

/// Builds the English mnemonic for `entropy` (16 bytes gives 12 words).
pub fn entropy_to_mnemonic(entropy: &[u8]) -> Result<Zeroizing<String>, DepositError> {
    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy)
        .map_err(|e| DepositError::DerivationError(format!("mnemonic: {e}")))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Derive the 64-byte seed from a mnemonic and passphrase.
pub fn mnemonic_to_seed(
    phrase: &str,
    passphrase: &str,
) -> Result<Zeroizing<[u8; SEED_LEN]>, DepositError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| DepositError::DerivationError(format!("mnemonic: {e}")))?;

    Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
}
