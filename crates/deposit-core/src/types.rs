use std::fmt;

use serde::{Deserialize, Serialize};

/// An asset on a specific chain: a native denom or a token contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainAsset {
    pub chain_id: String,
    #[serde(alias = "contract")]
    pub denom: String,
}

impl ChainAsset {
    pub fn new(chain_id: impl Into<String>, denom: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            denom: denom.into(),
        }
    }
}

impl fmt::Display for ChainAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.denom, self.chain_id)
    }
}

/// What the funding widget needs to call the deposit contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationPayload {
    pub address: String,
    pub name: String,
    pub gas_limit: u64,
    /// Hex call data.
    pub payload: String,
    pub logo_uri: String,
}
