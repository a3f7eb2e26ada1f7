//! In-memory collaborators for tests and demos.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use router_api::{
    MsgsRequest, MsgsResponse, RoutePlan, RouteRequest, RouterError, RouterResult, RoutingService,
    SwapRequest, SwapResponse, SwapService,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::signer::{EvmCall, EvmSender, SignerError};
use crate::widget::{FundingWidget, WidgetDestination, WidgetError, WidgetEvent};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A canned routing-service answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Status { status: u16, message: String },
    Invalid(String),
}

impl MockReply {
    fn produce<T: DeserializeOwned>(&self) -> RouterResult<T> {
        match self {
            MockReply::Json(value) => serde_json::from_value(value.clone())
                .map_err(|e| RouterError::InvalidResponse(e.to_string())),
            MockReply::Status { status, message } => Err(RouterError::Status {
                status: *status,
                message: message.clone(),
            }),
            MockReply::Invalid(message) => Err(RouterError::InvalidResponse(message.clone())),
        }
    }
}

/// Routing service that answers from fixed replies and records requests.
pub struct MockRoutingService {
    route_reply: MockReply,
    msgs_reply: MockReply,
    delay: Duration,
    route_requests: Mutex<Vec<RouteRequest>>,
    msgs_requests: Mutex<Vec<MsgsRequest>>,
}

impl MockRoutingService {
    pub fn new(route_reply: MockReply, msgs_reply: MockReply) -> Self {
        Self {
            route_reply,
            msgs_reply,
            delay: Duration::ZERO,
            route_requests: Mutex::new(Vec::new()),
            msgs_requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `/route` with `reply` and `/msgs` with a valid EVM message.
    pub fn with_route(reply: MockReply) -> Self {
        Self::new(reply, MockReply::Json(msgs_json(DEMO_CALL_DATA)))
    }

    /// Answers `/msgs` with `reply` and `/route` with a one-hop route.
    pub fn with_msgs(reply: MockReply) -> Self {
        Self::new(MockReply::Json(plan_json(&["42161", "noble-1"])), reply)
    }

    /// Delays every answer, for timeout and cancellation tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn route_requests(&self) -> Vec<RouteRequest> {
        lock(&self.route_requests).clone()
    }

    pub fn msgs_requests(&self) -> Vec<MsgsRequest> {
        lock(&self.msgs_requests).clone()
    }

    /// Total calls across both endpoints.
    pub fn calls(&self) -> usize {
        lock(&self.route_requests).len() + lock(&self.msgs_requests).len()
    }
}

#[async_trait]
impl RoutingService for MockRoutingService {
    async fn route(&self, request: &RouteRequest) -> RouterResult<RoutePlan> {
        lock(&self.route_requests).push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.route_reply.produce()
    }

    async fn msgs(&self, request: &MsgsRequest) -> RouterResult<MsgsResponse> {
        lock(&self.msgs_requests).push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.msgs_reply.produce()
    }
}

/// Bridge service that answers every swap with one reply.
pub struct MockSwapService {
    reply: MockReply,
    requests: Mutex<Vec<SwapRequest>>,
}

impl MockSwapService {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SwapRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl SwapService for MockSwapService {
    async fn create_swap(&self, request: &SwapRequest) -> RouterResult<SwapResponse> {
        lock(&self.requests).push(request.clone());
        self.reply.produce()
    }
}

/// A call made on [`MockSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentCall {
    Read(EvmCall),
    Send(EvmCall),
}

/// Source wallet with a fixed token allowance. Sent transactions get
/// sequential hashes.
pub struct MockSender {
    address: String,
    allowance: u128,
    reject_sends: bool,
    calls: Mutex<Vec<SentCall>>,
}

impl MockSender {
    pub fn with_allowance(allowance: u128) -> Self {
        Self {
            address: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            allowance,
            reject_sends: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `send_transaction` is refused by the user.
    pub fn rejecting_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub fn calls(&self) -> Vec<SentCall> {
        lock(&self.calls).clone()
    }

    /// Transactions sent, in order.
    pub fn sent(&self) -> Vec<EvmCall> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                SentCall::Send(call) => Some(call.clone()),
                SentCall::Read(_) => None,
            })
            .collect()
    }

    /// Hash returned for the `index`-th sent transaction.
    pub fn hash_of(&self, index: usize) -> String {
        format!("0x{:064x}", index + 1)
    }
}

#[async_trait]
impl EvmSender for MockSender {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn call(&self, call: &EvmCall) -> Result<Vec<u8>, SignerError> {
        lock(&self.calls).push(SentCall::Read(call.clone()));
        let mut word = vec![0u8; 32];
        word[16..].copy_from_slice(&self.allowance.to_be_bytes());
        Ok(word)
    }

    async fn send_transaction(&self, call: &EvmCall) -> Result<String, SignerError> {
        if self.reject_sends {
            return Err(SignerError::Rejected);
        }
        let mut calls = lock(&self.calls);
        calls.push(SentCall::Send(call.clone()));
        let index = calls
            .iter()
            .filter(|c| matches!(c, SentCall::Send(_)))
            .count()
            - 1;
        Ok(self.hash_of(index))
    }
}

/// A call made on [`MockWidget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetCall {
    SetRequestedAmount(String),
    SetDestination(WidgetDestination),
    Open,
    Close,
}

/// Funding widget that records calls and reports a scripted outcome.
#[derive(Default)]
pub struct MockWidget {
    outcome: Option<WidgetEvent>,
    open_error: Option<String>,
    calls: Mutex<Vec<WidgetCall>>,
    pending: Mutex<Option<oneshot::Sender<WidgetEvent>>>,
}

impl MockWidget {
    /// A widget that stays open until [`MockWidget::finish`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A widget that reports `event` as soon as it is opened.
    pub fn reporting(event: WidgetEvent) -> Self {
        Self {
            outcome: Some(event),
            ..Self::default()
        }
    }

    pub fn failing_to_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Reports `event` on the currently open widget.
    pub fn finish(&self, event: WidgetEvent) -> bool {
        match lock(&self.pending).take() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<WidgetCall> {
        lock(&self.calls).clone()
    }

    pub fn opened(&self) -> usize {
        self.count(|c| matches!(c, WidgetCall::Open))
    }

    pub fn closed(&self) -> usize {
        self.count(|c| matches!(c, WidgetCall::Close))
    }

    pub fn is_open(&self) -> bool {
        lock(&self.pending).is_some()
    }

    fn count(&self, pred: impl Fn(&WidgetCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }
}

impl FundingWidget for MockWidget {
    fn set_requested_amount(&self, amount: &str) -> Result<(), WidgetError> {
        lock(&self.calls).push(WidgetCall::SetRequestedAmount(amount.to_string()));
        Ok(())
    }

    fn set_destination(&self, destination: WidgetDestination) -> Result<(), WidgetError> {
        lock(&self.calls).push(WidgetCall::SetDestination(destination));
        Ok(())
    }

    fn open(&self) -> Result<oneshot::Receiver<WidgetEvent>, WidgetError> {
        lock(&self.calls).push(WidgetCall::Open);
        if let Some(message) = &self.open_error {
            return Err(WidgetError(message.clone()));
        }

        let (tx, rx) = oneshot::channel();
        match &self.outcome {
            Some(event) => {
                let _ = tx.send(event.clone());
            }
            None => *lock(&self.pending) = Some(tx),
        }
        Ok(rx)
    }

    fn close(&self) {
        lock(&self.calls).push(WidgetCall::Close);
        lock(&self.pending).take();
    }
}

/// Call data used by [`msgs_json`] fixtures.
pub const DEMO_CALL_DATA: &str = "0x8b2a8d3c000000000000000000000000af88d065e77c8cc2239327c5edb3a432268e5831";

/// A one-operation route from Arbitrum USDC to Noble, asking for an address
/// on each of `required_chain_addresses`.
pub fn plan_json(required_chain_addresses: &[&str]) -> Value {
    json!({
        "source_asset_denom": "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
        "source_asset_chain_id": "42161",
        "dest_asset_denom": "uusdc",
        "dest_asset_chain_id": "noble-1",
        "amount_in": "5000000",
        "amount_out": "4985000",
        "operations": [{
            "go_fast_transfer": {
                "from_chain_id": "42161",
                "to_chain_id": "noble-1",
                "bridge_id": "GO_FAST",
                "denom_in": "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
                "denom_out": "uusdc"
            },
            "tx_index": 0,
            "amount_in": "5000000",
            "amount_out": "4985000"
        }],
        "chain_ids": required_chain_addresses,
        "does_swap": false,
        "estimated_amount_out": "4985000",
        "txs_required": 1,
        "estimated_fees": [],
        "required_chain_addresses": required_chain_addresses,
        "estimated_route_duration_seconds": 15
    })
}

/// A `/msgs` answer holding one Arbitrum transaction with `data`.
pub fn msgs_json(data: &str) -> Value {
    json!({
        "msgs": [{
            "evm_tx": {
                "chain_id": "42161",
                "to": "0x23cb6147e5600c23d1fb5543916d3d5457c9b54c",
                "value": "0",
                "data": data,
                "required_erc20_approvals": [{
                    "token_contract": "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
                    "spender": "0x23cb6147e5600c23d1fb5543916d3d5457c9b54c",
                    "amount": "5000000"
                }],
                "signer_address": "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
            }
        }],
        "txs": [],
        "estimated_fees": []
    })
}

/// Bridge contract used by [`swap_json`] fixtures.
pub const BRIDGE_DEPOSIT: &str = "0x000000000000000000000000000000000000dEaD";

/// A bridge swap whose single deposit action calls `to` with `call_data`.
pub fn swap_json(to: &str, call_data: &str) -> Value {
    json!({
        "data": {
            "swap_id": "0b9b3b2e-6f1c-4f4e-9a51-3d2f1c0e7a11",
            "deposit_actions": [{
                "to_address": to,
                "call_data": call_data,
                "amount_in_base_units": "5000000"
            }]
        }
    })
}
