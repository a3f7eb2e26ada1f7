use thiserror::Error;

/// Cosmos address operation errors.
#[derive(Debug, Error)]
pub enum CosmosError {
    #[error("invalid bech32 address: {0}")]
    InvalidAddress(String),

    #[error("invalid bech32 prefix: {0}")]
    InvalidPrefix(String),

    #[error("prefix mismatch: expected {expected}, got {actual}")]
    PrefixMismatch { expected: String, actual: String },

    #[error("invalid account length: {0} bytes")]
    InvalidLength(usize),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}
