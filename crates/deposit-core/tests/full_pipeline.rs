//! Cross-crate integration tests exercising the full deposit pipeline:
//! signer -> derived account -> route -> messages -> funding widget, and the
//! forward flow: widget -> wallet -> bridge swap -> follow-on transfer.
//!
//! The routing and bridge services are an in-process axum server, so these
//! tests run the real `RouterClient` and `SwapClient` over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use chain_eth::{TypedData, SIGNATURE_LEN};
use deposit_core::mocks::{
    msgs_json, plan_json, swap_json, MockSender, MockWidget, WidgetCall, BRIDGE_DEPOSIT,
    DEMO_CALL_DATA,
};
use deposit_core::*;
use router_api::{SwapConfig, MSGS_PATH, ROUTE_PATH, SWAPS_PATH};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const SIGNER_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
const ROUTE_CHAINS: [&str; 3] = ["42161", "osmosis-1", "noble-1"];

#[derive(Clone)]
struct Stub {
    route_status: StatusCode,
    route_body: Value,
    msgs_body: Value,
    hits: Arc<Mutex<Vec<(String, Value)>>>,
}

struct RoutingServer {
    base_url: String,
    hits: Arc<Mutex<Vec<(String, Value)>>>,
    handle: JoinHandle<()>,
}

impl Drop for RoutingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(State(stub): State<Stub>, uri: Uri, body: String) -> (StatusCode, Json<Value>) {
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    stub.hits.lock().unwrap().push((uri.path().to_string(), body));

    match uri.path() {
        ROUTE_PATH => (stub.route_status, Json(stub.route_body.clone())),
        MSGS_PATH => (StatusCode::OK, Json(stub.msgs_body.clone())),
        SWAPS_PATH => (StatusCode::OK, Json(swap_json(BRIDGE_DEPOSIT, "0xdeadbeef"))),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "no such endpoint" }))),
    }
}

impl RoutingServer {
    async fn healthy() -> Self {
        Self::spawn(StatusCode::OK, plan_json(&ROUTE_CHAINS)).await
    }

    async fn spawn(route_status: StatusCode, route_body: Value) -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let stub = Stub {
            route_status,
            route_body,
            msgs_body: msgs_json(DEMO_CALL_DATA),
            hits: hits.clone(),
        };
        let app = Router::new().fallback(respond).with_state(stub);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
            handle,
        }
    }

    fn paths(&self) -> Vec<String> {
        self.hits.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    fn body(&self, path: &str) -> Value {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .unwrap_or(Value::Null)
    }
}

struct RefusingSigner;

#[async_trait]
impl TypedDataSigner for RefusingSigner {
    fn address(&self) -> String {
        SIGNER_ADDRESS.into()
    }

    async fn sign_typed_data(&self, _: &TypedData) -> Result<[u8; SIGNATURE_LEN], SignerError> {
        Err(SignerError::Rejected)
    }
}

fn local_signer() -> Arc<LocalSigner> {
    Arc::new(
        LocalSigner::from_hex("0x0000000000000000000000000000000000000000000000000000000000000001")
            .unwrap(),
    )
}

fn orchestrator(
    server: &RoutingServer,
    signer: Arc<dyn TypedDataSigner>,
    widget: Arc<MockWidget>,
) -> Arc<DepositOrchestrator> {
    let config = DepositConfig::default().with_overrides_from(|name| {
        (name == deposit_core::config::ENV_BASE_URL).then(|| server.base_url.clone())
    });
    Arc::new(DepositOrchestrator::with_router_client(config, signer, widget).unwrap())
}

fn states(rx: &mut broadcast::Receiver<StateChange>) -> Vec<DepositState> {
    let mut out = Vec::new();
    while let Ok(change) = rx.try_recv() {
        out.push(change.state);
    }
    out
}

async fn wait_until_open(widget: &MockWidget) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !widget.is_open() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("widget never opened");
}

// ─── Scenario: derived account, healthy routing service ─────────────

#[tokio::test]
async fn five_usdc_to_derived_account_reaches_widget() {
    let server = RoutingServer::healthy().await;
    let widget = Arc::new(MockWidget::new());
    let signer = local_signer();
    let orch = orchestrator(&server, signer.clone(), widget.clone());
    let mut events = orch.subscribe();

    let running = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.deposit(DepositRequest::derived("5")).await })
    };
    wait_until_open(&widget).await;

    assert_eq!(
        states(&mut events),
        [
            DepositState::AddressPrepared,
            DepositState::RouteResolved,
            DepositState::PayloadReady,
            DepositState::AwaitingExternalExecution,
        ]
    );
    assert_eq!(widget.opened(), 1);
    assert_eq!(server.paths(), [ROUTE_PATH, MSGS_PATH]);

    // Route request: base units and the configured assets.
    let route = server.body(ROUTE_PATH);
    assert_eq!(route["amount_in"], "5000000");
    assert_eq!(route["source_asset_chain_id"], "42161");
    assert_eq!(route["dest_asset_chain_id"], "noble-1");
    assert_eq!(route["smart_relay"], true);

    // The destination is the signer's onboarding account, rendered for Noble.
    let signature = signer.sign_typed_data(&onboarding_typed_data()).await.unwrap();
    let expected = account_from_signature(&signature, "noble").unwrap();
    let msgs = server.body(MSGS_PATH);
    assert_eq!(
        msgs["address_list"],
        json!([SIGNER_ADDRESS, config::INTERMEDIATE_OSMO_ADDRESS, expected.as_str()])
    );
    assert_eq!(msgs["slippage_tolerance_percent"], "1");

    let calls = widget.calls();
    assert_eq!(calls[0], WidgetCall::SetRequestedAmount("5".into()));
    match &calls[1] {
        WidgetCall::SetDestination(WidgetDestination::Contract(payload)) => {
            assert_eq!(payload.payload, DEMO_CALL_DATA);
            assert_eq!(payload.address, config::DYDX_DEPOSIT_CONTRACT);
            assert_eq!(payload.gas_limit, 800_000);
        }
        other => panic!("unexpected widget call {other:?}"),
    }

    assert!(widget.finish(WidgetEvent::TransactionSuccess {
        tx_hash: Some("0xfeed".into()),
    }));
    let outcome = running.await.unwrap().unwrap();
    assert_eq!(outcome.destination, expected);
    assert_eq!(outcome.destination.prefix(), Some("noble"));
    assert_eq!(outcome.tx_hash.as_deref(), Some("0xfeed"));
    assert_eq!(orch.state(), DepositState::Completed);
    assert_eq!(widget.opened(), 1);
}

// ─── Scenario: routing service fails on /route ──────────────────────

#[tokio::test]
async fn server_error_on_route_fails_without_widget() {
    let server = RoutingServer::spawn(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "internal error" }),
    )
    .await;
    let widget = Arc::new(MockWidget::new());
    let orch = orchestrator(&server, local_signer(), widget.clone());
    let mut events = orch.subscribe();

    let failure = orch.deposit(DepositRequest::derived("5")).await.unwrap_err();

    assert_eq!(failure.step, Step::Route);
    assert!(matches!(failure.error, DepositError::RouteNotFound(_)));
    assert_eq!(
        states(&mut events),
        [DepositState::AddressPrepared, DepositState::Failed, DepositState::Idle]
    );
    assert_eq!(widget.opened(), 0);
    assert_eq!(server.paths(), [ROUTE_PATH]);
}

#[tokio::test]
async fn empty_route_is_route_not_found() {
    let mut plan = plan_json(&ROUTE_CHAINS);
    plan["operations"] = json!([]);
    let server = RoutingServer::spawn(StatusCode::OK, plan).await;
    let widget = Arc::new(MockWidget::new());
    let orch = orchestrator(&server, local_signer(), widget.clone());

    let failure = orch
        .deposit(DepositRequest::to_address("1", "noble19rl4cm2hmr8afy4kldpxz3fka4jguq0a5rc48m"))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, DepositError::RouteNotFound(_)));
    assert_eq!(widget.opened(), 0);
}

// ─── Scenario: user refuses the onboarding signature ────────────────

#[tokio::test]
async fn refused_signature_resets_without_network() {
    let server = RoutingServer::healthy().await;
    let widget = Arc::new(MockWidget::new());
    let orch = orchestrator(&server, Arc::new(RefusingSigner), widget.clone());
    let mut events = orch.subscribe();

    let failure = orch.deposit(DepositRequest::derived("5")).await.unwrap_err();

    assert_eq!(failure.step, Step::Address);
    assert!(matches!(failure.error, DepositError::SignatureDenied(_)));
    assert_eq!(orch.state(), DepositState::Idle);
    assert_eq!(states(&mut events), [DepositState::Failed, DepositState::Idle]);
    assert!(server.paths().is_empty());
    assert_eq!(widget.opened(), 0);
}

// ─── Input validation ───────────────────────────────────────────────

#[tokio::test]
async fn missing_amount_makes_no_calls() {
    let server = RoutingServer::healthy().await;
    let widget = Arc::new(MockWidget::new());
    let orch = orchestrator(&server, local_signer(), widget.clone());

    let failure = orch.deposit(DepositRequest::derived("")).await.unwrap_err();

    assert!(matches!(failure.error, DepositError::MissingAmount));
    assert!(server.paths().is_empty());
    assert_eq!(widget.opened(), 0);
}

#[tokio::test]
async fn entered_evm_address_is_rejected_without_network() {
    let server = RoutingServer::healthy().await;
    let widget = Arc::new(MockWidget::new());
    let orch = orchestrator(&server, local_signer(), widget.clone());

    let failure = orch
        .deposit(DepositRequest::to_address("0.25", "0x28ff5c6d57d8cfd492b6fb42614536ed648e01fd"))
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Address);
    assert!(matches!(failure.error, DepositError::InvalidAddressEncoding(_)));
    assert!(server.paths().is_empty());
    assert_eq!(widget.opened(), 0);
    assert_eq!(orch.state(), DepositState::Idle);
}

#[tokio::test]
async fn entered_dydx_address_is_rendered_for_destination_chain() {
    let server = RoutingServer::healthy().await;
    let widget = Arc::new(MockWidget::reporting(WidgetEvent::TransactionSuccess {
        tx_hash: None,
    }));
    let orch = orchestrator(&server, local_signer(), widget);

    let outcome = orch
        .deposit(DepositRequest::to_address("0.25", "dydx19rl4cm2hmr8afy4kldpxz3fka4jguq0a4erelz"))
        .await
        .unwrap();

    assert_eq!(outcome.destination.as_str(), "noble19rl4cm2hmr8afy4kldpxz3fka4jguq0a5rc48m");
    assert_eq!(outcome.amount.base_units(), 250_000);
    assert_eq!(server.body(ROUTE_PATH)["amount_in"], "250000");
}

// ─── Scenario: widget funds the wallet, bridge forwards it ──────────

#[tokio::test]
async fn forward_bridges_funded_wallet_over_http() {
    let server = RoutingServer::healthy().await;
    let widget = Arc::new(MockWidget::reporting(WidgetEvent::TransactionSuccess {
        tx_hash: Some("0xfund".into()),
    }));
    let sender = Arc::new(MockSender::with_allowance(10_000_000));

    let mut config = DepositConfig::default();
    config.forward.swap_api = SwapConfig::default().with_base_url(&server.base_url);
    let orch = DepositOrchestrator::with_router_client(config, local_signer(), widget.clone())
        .unwrap()
        .with_swap_client(sender.clone())
        .unwrap();

    let paradex = "0x04a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f";
    let outcome = orch.forward(ForwardRequest::new("7.5", paradex)).await.unwrap();

    assert_eq!(server.paths(), [SWAPS_PATH]);
    let swap = server.body(SWAPS_PATH);
    assert_eq!(swap["amount"], json!(7.5));
    assert_eq!(swap["source_network"], "ARBITRUM_MAINNET");
    assert_eq!(swap["destination_network"], "PARADEX_MAINNET");
    assert_eq!(swap["source_address"], SIGNER_ADDRESS);
    assert_eq!(swap["destination_address"], paradex);

    // Allowance already covers 7.5 USDC, so only the deposit is sent.
    assert_eq!(outcome.receipt.approval_tx, None);
    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, BRIDGE_DEPOSIT);
    assert_eq!(sent[0].data, [0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(sent[0].gas_limit, Some(100_000));

    assert_eq!(outcome.funding_tx.as_deref(), Some("0xfund"));
    assert!(matches!(
        &widget.calls()[1],
        WidgetCall::SetDestination(WidgetDestination::Wallet(wallet)) if wallet.as_str() == SIGNER_ADDRESS
    ));
    assert_eq!(orch.state(), DepositState::Completed);
}

// ─── Network ────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_service_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = DepositConfig::default()
        .with_overrides_from(|name| (name == config::ENV_BASE_URL).then(|| format!("http://127.0.0.1:{port}")));
    let widget = Arc::new(MockWidget::new());
    let orch = DepositOrchestrator::with_router_client(config, local_signer(), widget).unwrap();

    let failure = orch
        .deposit(DepositRequest::to_address("1", "noble19rl4cm2hmr8afy4kldpxz3fka4jguq0a5rc48m"))
        .await
        .unwrap_err();
    assert_eq!(failure.step, Step::Route);
    assert!(matches!(failure.error, DepositError::NetworkError(_)));
}

// ─── Derivation ─────────────────────────────────────────────────────

#[test]
fn zero_entropy_account_across_prefixes() {
    let cosmos = deriver::account_from_entropy(&[0u8; 16], "cosmos").unwrap();
    assert_eq!(cosmos.as_str(), "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4");

    let dydx = cosmos.reencode(&AddressEncoding::bech32("dydx")).unwrap();
    assert_eq!(dydx.as_str(), "dydx19rl4cm2hmr8afy4kldpxz3fka4jguq0a4erelz");

    let osmo = reencode(&dydx, &AddressEncoding::bech32("osmo")).unwrap();
    assert_eq!(osmo.as_str(), "osmo19rl4cm2hmr8afy4kldpxz3fka4jguq0a5m7df8");
    assert_eq!(osmo, cosmos);
}
