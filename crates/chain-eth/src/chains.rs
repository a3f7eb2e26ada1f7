use serde::Serialize;

/// An EVM network that can fund a deposit.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
}

impl EvmChain {
    /// Chain id as the routing service spells it (decimal string).
    pub fn routing_id(&self) -> String {
        self.chain_id.to_string()
    }
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
};

/// Arbitrum One (chain ID 42161).
pub const ARBITRUM: EvmChain = EvmChain {
    chain_id: 42161,
    name: "Arbitrum One",
};

/// Base (chain ID 8453).
pub const BASE: EvmChain = EvmChain {
    chain_id: 8453,
    name: "Base",
};

/// Optimism (chain ID 10).
pub const OPTIMISM: EvmChain = EvmChain {
    chain_id: 10,
    name: "Optimism",
};

/// Polygon PoS (chain ID 137).
pub const POLYGON: EvmChain = EvmChain {
    chain_id: 137,
    name: "Polygon",
};

const ALL_CHAINS: &[&EvmChain] = &[&ETHEREUM, &ARBITRUM, &BASE, &OPTIMISM, &POLYGON];

/// Returns the chain definition for a given chain ID, or `None` if unsupported.
pub fn get_chain(chain_id: u64) -> Option<&'static EvmChain> {
    ALL_CHAINS.iter().find(|c| c.chain_id == chain_id).copied()
}

/// Looks a chain up by the routing service's string id.
pub fn get_chain_by_routing_id(chain_id: &str) -> Option<&'static EvmChain> {
    chain_id.parse::<u64>().ok().and_then(get_chain)
}
