//! The source-chain wallet seams: typed-data signing for account derivation
//! and transaction sending for follow-on transfers.

use async_trait::async_trait;
use chain_eth::{LocalKey, TypedData, SIGNATURE_LEN};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("user rejected the request")]
    Rejected,

    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    #[error("signing failed: {0}")]
    Failed(String),
}

/// A wallet on the source chain that can sign EIP-712 typed data.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// The wallet's `0x` account.
    fn address(&self) -> String;

    /// Signs `data`, returning `r ‖ s ‖ v`.
    async fn sign_typed_data(&self, data: &TypedData) -> Result<[u8; SIGNATURE_LEN], SignerError>;
}

/// A contract call on an EVM chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmCall {
    pub chain_id: u64,
    pub to: String,
    pub data: Vec<u8>,
    /// `None` lets the wallet estimate.
    pub gas_limit: Option<u64>,
}

/// A wallet on the source chain that can read contracts and send
/// transactions.
#[async_trait]
pub trait EvmSender: Send + Sync {
    /// The wallet's `0x` account.
    fn address(&self) -> String;

    /// Read-only `eth_call`, returning the raw return data.
    async fn call(&self, call: &EvmCall) -> Result<Vec<u8>, SignerError>;

    /// Sends `call` from the wallet and resolves once it is mined, with the
    /// transaction hash.
    async fn send_transaction(&self, call: &EvmCall) -> Result<String, SignerError>;
}

/// Signs with a key held in process.
#[derive(Debug)]
pub struct LocalSigner {
    key: LocalKey,
}

impl LocalSigner {
    pub fn from_private_key(private_key: &[u8; 32]) -> Result<Self, SignerError> {
        let key = LocalKey::from_bytes(private_key).map_err(|e| SignerError::Failed(e.to_string()))?;
        Ok(Self { key })
    }

    /// Parses a `0x`-prefixed (or bare) 64-character hex key.
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let body = private_key.trim().trim_start_matches("0x");
        let mut bytes = zeroize::Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(body, &mut bytes[..])
            .map_err(|e| SignerError::Failed(format!("private key: {e}")))?;
        Self::from_private_key(&bytes)
    }
}

#[async_trait]
impl TypedDataSigner for LocalSigner {
    fn address(&self) -> String {
        self.key.address()
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<[u8; SIGNATURE_LEN], SignerError> {
        self.key
            .sign_typed_data(data)
            .map_err(|e| SignerError::Failed(e.to_string()))
    }
}
