//! Deterministic destination accounts from a source-wallet signature.
//!
//! The wallet signs a fixed onboarding message; the signature seeds a
//! mnemonic whose first Cosmos account becomes the destination. The same
//! wallet therefore always lands on the same account, on any device.

use chain_eth::{Eip712Domain, TypedData, SIGNATURE_LEN};
use sha3::{Digest, Keccak256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::address::{Address, AddressEncoding};
use crate::error::DepositError;
use crate::hd_derivation::derive_cosmos_pubkey;
use crate::mnemonic::{entropy_to_mnemonic, mnemonic_to_seed};
use crate::signer::{SignerError, TypedDataSigner};

pub const ONBOARDING_DOMAIN: &str = "dYdX";
pub const ONBOARDING_ACTION: &str = "dYdX Chain Onboarding";

/// Bytes of the signature hash used as BIP-39 entropy.
const ENTROPY_LEN: usize = 16;

/// The typed message every wallet signs to recover its account.
pub fn onboarding_typed_data() -> TypedData {
    TypedData::new(
        Eip712Domain {
            name: ONBOARDING_DOMAIN.into(),
            version: "1".into(),
            chain_id: 1,
        },
        ONBOARDING_DOMAIN,
    )
    .with_field("action", ONBOARDING_ACTION)
}

/// Entropy for a signature: the first 16 bytes of Keccak-256 over the
/// signature's `0x`-prefixed lower-case hex text.
pub fn signature_entropy(signature: &[u8; SIGNATURE_LEN]) -> Zeroizing<[u8; ENTROPY_LEN]> {
    let text = Zeroizing::new(format!("0x{}", hex::encode(signature)));
    let hash = Zeroizing::new(<[u8; 32]>::from(Keccak256::digest(text.as_bytes())));

    let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
    entropy.copy_from_slice(&hash[..ENTROPY_LEN]);
    entropy
}

/// The first Cosmos account of the mnemonic built from `entropy`, under `prefix`.
pub fn account_from_entropy(entropy: &[u8], prefix: &str) -> Result<Address, DepositError> {
    let phrase = entropy_to_mnemonic(entropy)?;
    let seed = mnemonic_to_seed(&phrase, "")?;
    let pubkey = derive_cosmos_pubkey(&seed[..], 0, 0)?;

    let address = chain_cosmos::pubkey_to_address(&pubkey, prefix)
        .map_err(|e| DepositError::DerivationError(e.to_string()))?;
    Address::parse(&address, &AddressEncoding::bech32(prefix))
}

/// The account a signature maps to.
pub fn account_from_signature(
    signature: &[u8; SIGNATURE_LEN],
    prefix: &str,
) -> Result<Address, DepositError> {
    let entropy = signature_entropy(signature);
    account_from_entropy(&entropy[..], prefix)
}

/// Asks `signer` for the onboarding signature and derives its account.
pub async fn derive_account(
    signer: &dyn TypedDataSigner,
    prefix: &str,
) -> Result<Address, DepositError> {
    let data = onboarding_typed_data();
    let signature = signer.sign_typed_data(&data).await.map_err(|e| {
        warn!(error = %e, "onboarding signature not obtained");
        match e {
            SignerError::Rejected => DepositError::SignatureDenied("user rejected the request".into()),
            other => DepositError::DerivationError(format!("onboarding signature: {other}")),
        }
    })?;

    let account = account_from_signature(&signature, prefix)?;
    debug!(%account, "derived destination account");
    Ok(account)
}
