//! Deposit configuration.
//!
//! Every field defaults to the production deployment, so an empty TOML
//! document is a valid configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bech32::Hrp;
use router_api::{RouteOptions, RouterConfig, SwapConfig};
use serde::{Deserialize, Serialize};

use crate::error::DepositError;
use crate::types::ChainAsset;

pub const ENV_BASE_URL: &str = "ROUTER_API_BASE_URL";
pub const ENV_API_KEY: &str = "ROUTER_API_KEY";
pub const ENV_SWAP_API_KEY: &str = "LAYERSWAP_API_KEY";

/// Highest accepted slippage tolerance (100%).
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

pub const USDC_ON_ARBITRUM: &str = "0xaf88d065e77c8cc2239327c5edb3a432268e5831";
pub const INTERMEDIATE_OSMO_ADDRESS: &str = "osmo1l8p5qxlwg52grsf63wtdtgtfzzqgjpfc526y4a";
/// Deposit contract on Arbitrum the widget calls for dYdX deposits.
pub const DYDX_DEPOSIT_CONTRACT: &str = "0xFE6e4C80AC3Bd9B849789C43c0D6c6A98B6880E3";

/// What the funding widget is told about the contract it calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractSettings {
    /// Contract the widget calls. `None` or an empty string falls back to
    /// the first message's target.
    pub address: Option<String>,
    pub name: String,
    pub gas_limit: u64,
    pub logo_uri: String,
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            address: Some(DYDX_DEPOSIT_CONTRACT.into()),
            name: "DYDX Deposit".into(),
            gas_limit: 800_000,
            logo_uri: "https://dydx.exchange/icon.svg".into(),
        }
    }
}

/// Follow-on bridge transfer out of the source wallet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwardSettings {
    pub swap_api: SwapConfig,
    pub source_network: String,
    pub destination_network: String,
    pub source_token: String,
    pub destination_token: String,
    /// Gas limit of the bridge deposit transaction.
    pub gas_limit: u64,
}

impl Default for ForwardSettings {
    fn default() -> Self {
        Self {
            swap_api: SwapConfig::default(),
            source_network: "ARBITRUM_MAINNET".into(),
            destination_network: "PARADEX_MAINNET".into(),
            source_token: "USDC".into(),
            destination_token: "USDC".into(),
            gas_limit: 100_000,
        }
    }
}

impl ForwardSettings {
    fn validate(&self) -> Result<(), DepositError> {
        self.swap_api
            .validate()
            .map_err(|e| DepositError::Config(format!("swap_api: {e}")))?;

        let names = [
            &self.source_network,
            &self.destination_network,
            &self.source_token,
            &self.destination_token,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(DepositError::Config(
                "forward networks and tokens must be named".into(),
            ));
        }
        if self.gas_limit == 0 {
            return Err(DepositError::Config("forward gas_limit must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    pub router: RouterConfig,
    pub route_options: RouteOptions,
    pub source_asset: ChainAsset,
    pub source_decimals: u8,
    pub destination_asset: ChainAsset,
    /// Prefix the destination account is rendered under.
    pub destination_prefix: String,
    /// Prefix derived accounts are first rendered under.
    pub account_prefix: String,
    /// Chain id → bech32 prefix, consulted before the built-in table.
    pub chain_prefixes: BTreeMap<String, String>,
    /// Fixed addresses used for intermediate chains of a route.
    pub relay_addresses: BTreeMap<String, String>,
    pub slippage_bps: u32,
    pub contract: ContractSettings,
    pub forward: ForwardSettings,
}

impl Default for DepositConfig {
    fn default() -> Self {
        let chain_prefixes = [
            ("osmosis-1", "osmo"),
            ("noble-1", "noble"),
            ("dydx-mainnet-1", "dydx"),
        ]
        .into_iter()
        .map(|(chain, prefix)| (chain.to_string(), prefix.to_string()))
        .collect();

        let relay_addresses = BTreeMap::from([(
            "osmosis-1".to_string(),
            INTERMEDIATE_OSMO_ADDRESS.to_string(),
        )]);

        Self {
            router: RouterConfig::default(),
            route_options: RouteOptions::default(),
            source_asset: ChainAsset::new("42161", USDC_ON_ARBITRUM),
            source_decimals: 6,
            destination_asset: ChainAsset::new("noble-1", "uusdc"),
            destination_prefix: "noble".into(),
            account_prefix: "dydx".into(),
            chain_prefixes,
            relay_addresses,
            slippage_bps: 100,
            contract: ContractSettings::default(),
            forward: ForwardSettings::default(),
        }
    }
}

impl DepositConfig {
    pub fn from_toml(text: &str) -> Result<Self, DepositError> {
        let config: DepositConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DepositError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| DepositError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Applies `ROUTER_API_BASE_URL`, `ROUTER_API_KEY` and
    /// `LAYERSWAP_API_KEY` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.router = self.router.with_base_url(base_url.trim());
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.router = self.router.with_api_key(api_key);
        }
        if let Some(api_key) = lookup(ENV_SWAP_API_KEY) {
            self.forward.swap_api = self.forward.swap_api.with_api_key(api_key);
        }
        self
    }

    pub fn validate(&self) -> Result<(), DepositError> {
        self.router
            .validate()
            .map_err(|e| DepositError::Config(e.to_string()))?;
        self.forward.validate()?;

        if self.slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(DepositError::Config(format!(
                "slippage_bps {} exceeds {MAX_SLIPPAGE_BPS}",
                self.slippage_bps
            )));
        }

        for asset in [&self.source_asset, &self.destination_asset] {
            if asset.chain_id.is_empty() || asset.denom.is_empty() {
                return Err(DepositError::Config(format!("incomplete asset {asset}")));
            }
        }

        let prefixes = [&self.destination_prefix, &self.account_prefix]
            .into_iter()
            .chain(self.chain_prefixes.values());
        for prefix in prefixes {
            Hrp::parse(prefix)
                .map_err(|e| DepositError::Config(format!("prefix {prefix:?}: {e}")))?;
        }

        Ok(())
    }

    /// Bech32 prefix for a chain id, from config first, then the known table.
    pub fn prefix_for_chain(&self, chain_id: &str) -> Option<&str> {
        self.chain_prefixes
            .get(chain_id)
            .map(String::as_str)
            .or_else(|| chain_cosmos::prefix::prefix_for_chain(chain_id))
    }
}
