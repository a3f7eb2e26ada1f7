use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::address::{to_checksum_address, verifying_key_to_bytes};
use crate::error::EthError;
use crate::typed_data::TypedData;

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// A secp256k1 key held in process, used where no external wallet signs.
pub struct LocalKey {
    key: SigningKey,
}

impl LocalKey {
    pub fn from_bytes(private_key: &[u8; 32]) -> Result<Self, EthError> {
        let mut key_bytes = *private_key;
        let key = SigningKey::from_bytes((&key_bytes).into())
            .map_err(|e| EthError::InvalidPrivateKey(e.to_string()));
        key_bytes.zeroize();
        Ok(Self { key: key? })
    }

    /// Checksummed `0x` address of this key.
    pub fn address(&self) -> String {
        to_checksum_address(&verifying_key_to_bytes(self.key.verifying_key()))
    }

    /// Signs the EIP-712 digest of `data`, returning `r ‖ s ‖ v` with
    /// `v` in {27, 28} as wallets do.
    pub fn sign_typed_data(&self, data: &TypedData) -> Result<[u8; SIGNATURE_LEN], EthError> {
        sign_prehash(&self.key, &data.signing_hash())
    }
}

impl std::fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKey")
            .field("address", &self.address())
            .finish()
    }
}

fn sign_prehash(key: &SigningKey, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], EthError> {
    let (signature, recovery_id): (Signature, RecoveryId) = key
        .sign_prehash(digest)
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let mut sig = [0u8; SIGNATURE_LEN];
    sig[..32].copy_from_slice(&signature.r().to_bytes());
    sig[32..64].copy_from_slice(&signature.s().to_bytes());
    sig[64] = recovery_id.is_y_odd() as u8 + 27;
    Ok(sig)
}

/// Recovers the checksummed address that produced `signature` over `data`.
pub fn recover_typed_data_signer(
    data: &TypedData,
    signature: &[u8; SIGNATURE_LEN],
) -> Result<String, EthError> {
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| EthError::InvalidSignature(e.to_string()))?;

    let v = match signature[64] {
        27 | 28 => signature[64] - 27,
        0 | 1 => signature[64],
        other => {
            return Err(EthError::InvalidSignature(format!(
                "unexpected recovery byte {other}"
            )))
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| EthError::InvalidSignature("bad recovery id".into()))?;

    let key = VerifyingKey::recover_from_prehash(&data.signing_hash(), &sig, recovery_id)
        .map_err(|e| EthError::InvalidSignature(e.to_string()))?;

    Ok(to_checksum_address(&verifying_key_to_bytes(&key)))
}
