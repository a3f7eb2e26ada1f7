//! Wire models for the routing service's `/v2/fungible` endpoints.
//!
//! Amounts stay decimal strings on the wire, exactly as the service sends
//! them. Operation legs are kept as raw JSON so that every bridge kind the
//! service knows about, including ones this crate has never seen, goes back
//! to `/msgs` byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Swap behaviour knobs nested in a route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartSwapOptions {
    pub split_routes: bool,
    pub evm_swaps: bool,
}

/// Feature flags sent with every route request.
///
/// These are an explicit configuration choice. The resolver never widens
/// them on its own after a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub smart_relay: bool,
    pub experimental_features: Vec<String>,
    pub allow_multi_tx: bool,
    pub allow_unsafe: bool,
    pub smart_swap_options: SmartSwapOptions,
    pub go_fast: bool,
    pub cumulative_affiliate_fee_bps: String,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            smart_relay: true,
            experimental_features: ["hyperlane", "stargate", "eureka", "layer_zero"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allow_multi_tx: false,
            allow_unsafe: true,
            smart_swap_options: SmartSwapOptions {
                split_routes: true,
                evm_swaps: true,
            },
            go_fast: true,
            cumulative_affiliate_fee_bps: "0".into(),
        }
    }
}

/// Body of `POST /v2/fungible/route`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRequest {
    pub amount_in: String,
    pub source_asset_chain_id: String,
    pub source_asset_denom: String,
    pub dest_asset_chain_id: String,
    pub dest_asset_denom: String,
    #[serde(flatten)]
    pub options: RouteOptions,
}

/// Asset metadata as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    pub denom: String,
    pub chain_id: String,
    pub origin_denom: String,
    pub origin_chain_id: String,
    pub trace: String,
    pub is_cw20: bool,
    pub is_evm: bool,
    pub is_svm: bool,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub logo_uri: Option<String>,
    pub decimals: Option<u8>,
    pub token_contract: Option<String>,
    pub coingecko_id: Option<String>,
    pub recommended_symbol: Option<String>,
}

/// A fee the route is expected to charge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatedFee {
    pub fee_type: String,
    pub bridge_id: String,
    pub amount: String,
    pub usd_amount: Option<String>,
    pub origin_asset: Option<Asset>,
    pub chain_id: String,
    pub tx_index: u32,
}

/// One hop of a route.
///
/// Besides the amounts, an operation carries exactly one leg object keyed by
/// its kind (`transfer`, `go_fast_transfer`, `cctp_transfer`, `swap`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub tx_index: u32,
    pub amount_in: String,
    pub amount_out: String,
    #[serde(flatten)]
    pub leg: Map<String, Value>,
}

impl Operation {
    fn leg_entry(&self) -> Option<(&String, &Map<String, Value>)> {
        self.leg
            .iter()
            .find_map(|(kind, body)| body.as_object().map(|obj| (kind, obj)))
    }

    fn leg_str(&self, key: &str) -> Option<&str> {
        self.leg_entry()
            .and_then(|(_, body)| body.get(key))
            .and_then(Value::as_str)
    }

    /// Leg kind, e.g. `"transfer"` or `"go_fast_transfer"`.
    pub fn kind(&self) -> Option<&str> {
        self.leg_entry().map(|(kind, _)| kind.as_str())
    }

    /// Chain the hop starts on. Swaps only name the chain they run on.
    pub fn from_chain_id(&self) -> Option<&str> {
        self.leg_str("from_chain_id").or_else(|| self.leg_str("chain_id"))
    }

    pub fn to_chain_id(&self) -> Option<&str> {
        self.leg_str("to_chain_id").or_else(|| self.leg_str("chain_id"))
    }

    pub fn bridge_id(&self) -> Option<&str> {
        self.leg_str("bridge_id")
    }
}

/// Response of `POST /v2/fungible/route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub source_asset_denom: String,
    pub source_asset_chain_id: String,
    pub dest_asset_denom: String,
    pub dest_asset_chain_id: String,
    pub amount_in: String,
    pub amount_out: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub chain_ids: Vec<String>,
    #[serde(default)]
    pub does_swap: bool,
    #[serde(default)]
    pub estimated_amount_out: Option<String>,
    #[serde(default)]
    pub txs_required: u32,
    #[serde(default)]
    pub usd_amount_in: Option<String>,
    #[serde(default)]
    pub usd_amount_out: Option<String>,
    #[serde(default)]
    pub estimated_fees: Vec<EstimatedFee>,
    /// Chains that must each be given an address, in `/msgs` order.
    #[serde(default)]
    pub required_chain_addresses: Vec<String>,
    #[serde(default)]
    pub estimated_route_duration_seconds: u64,
}

/// Body of `POST /v2/fungible/msgs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgsRequest {
    pub source_asset_denom: String,
    pub source_asset_chain_id: String,
    pub dest_asset_denom: String,
    pub dest_asset_chain_id: String,
    pub amount_in: String,
    pub amount_out: String,
    pub address_list: Vec<String>,
    pub operations: Vec<Operation>,
    pub slippage_tolerance_percent: String,
}

impl MsgsRequest {
    pub fn from_plan(plan: &RoutePlan, address_list: Vec<String>, slippage_bps: u32) -> Self {
        Self {
            source_asset_denom: plan.source_asset_denom.clone(),
            source_asset_chain_id: plan.source_asset_chain_id.clone(),
            dest_asset_denom: plan.dest_asset_denom.clone(),
            dest_asset_chain_id: plan.dest_asset_chain_id.clone(),
            amount_in: plan.amount_in.clone(),
            amount_out: plan.amount_out.clone(),
            address_list,
            operations: plan.operations.clone(),
            slippage_tolerance_percent: bps_to_percent(slippage_bps),
        }
    }
}

/// Renders basis points as the percent string the service expects:
/// `100` → `"1"`, `50` → `"0.5"`, `125` → `"1.25"`.
pub fn bps_to_percent(bps: u32) -> String {
    let whole = bps / 100;
    let frac = bps % 100;
    match frac {
        0 => whole.to_string(),
        f if f % 10 == 0 => format!("{whole}.{}", f / 10),
        f => format!("{whole}.{f:02}"),
    }
}

/// An ERC-20 allowance the signer must grant before the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc20Approval {
    pub token_contract: String,
    pub spender: String,
    pub amount: String,
}

/// An EVM transaction to be executed by the source-chain signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTx {
    pub chain_id: String,
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub required_erc20_approvals: Vec<Erc20Approval>,
    #[serde(default)]
    pub signer_address: String,
}

impl EvmTx {
    /// Hex call data, treating both `""` and a bare `"0x"` as empty.
    pub fn call_data(&self) -> Option<&str> {
        match self.data.trim() {
            "" | "0x" | "0X" => None,
            data => Some(data),
        }
    }
}

/// One executable message. Exactly one of the members is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutableMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_tx: Option<EvmTx>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cosmos_tx: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svm_tx: Option<Value>,
}

/// A message grouped with the operations it executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    #[serde(flatten)]
    pub message: ExecutableMessage,
    #[serde(default)]
    pub operations_indices: Vec<usize>,
}

/// Response of `POST /v2/fungible/msgs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgsResponse {
    pub msgs: Vec<ExecutableMessage>,
    #[serde(default)]
    pub txs: Vec<Tx>,
    #[serde(default)]
    pub estimated_fees: Vec<EstimatedFee>,
}

/// Error body returned with non-2xx statuses, either `{"message"}` or
/// `{"error": {"message"}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<NestedError>,
}

#[derive(Debug, Clone, Deserialize)]
struct NestedError {
    message: String,
}

impl ApiErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error.map(|e| e.message))
    }
}
