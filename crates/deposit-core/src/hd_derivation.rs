use bip32::{DerivationPath, XPrv};
use chain_cosmos::prefix::hd_path;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::DepositError;

/// Compressed secp256k1 public key at `m/44'/118'/account'/0/index`.
///
/// The private half never leaves this function; `XPrv` wipes itself on drop.
pub fn derive_cosmos_pubkey(
    seed: &[u8],
    account: u32,
    index: u32,
) -> Result<[u8; 33], DepositError> {
    let path: DerivationPath = hd_path(account, index)
        .parse()
        .map_err(|e: bip32::Error| DepositError::DerivationError(e.to_string()))?;

    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| DepositError::DerivationError(e.to_string()))?;

    xprv.private_key()
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .try_into()
        .map_err(|_| DepositError::DerivationError("invalid compressed public key".into()))
}
