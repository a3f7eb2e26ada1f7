/// dYdX chain account prefix.
pub const DYDX: &str = "dydx";

/// Noble account prefix.
pub const NOBLE: &str = "noble";

/// Osmosis account prefix.
pub const OSMOSIS: &str = "osmo";

/// Cosmos Hub account prefix.
pub const COSMOS_HUB: &str = "cosmos";

/// SLIP-44 coin type shared by Cosmos SDK chains.
pub const COSMOS_COIN_TYPE: u32 = 118;

/// Default Cosmos SDK derivation path for the first account.
pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

/// Look up the account prefix of a well-known mainnet chain id.
pub fn prefix_for_chain(chain_id: &str) -> Option<&'static str> {
    match chain_id {
        "dydx-mainnet-1" => Some(DYDX),
        "noble-1" => Some(NOBLE),
        "osmosis-1" => Some(OSMOSIS),
        "cosmoshub-4" => Some(COSMOS_HUB),
        _ => None,
    }
}

/// BIP-44 path for a Cosmos SDK account.
pub fn hd_path(account: u32, index: u32) -> String {
    format!("m/44'/{COSMOS_COIN_TYPE}'/{account}'/0/{index}")
}
