//! `RouterClient` and `SwapClient` against an in-process axum server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use router_api::{
    MsgsRequest, RouteOptions, RoutePlan, RouteRequest, RouterClient, RouterConfig, RouterError,
    RoutingService, SwapClient, SwapConfig, SwapRequest, SwapService, MSGS_PATH, ROUTE_PATH,
    SWAPS_PATH,
};
use serde_json::Value;
use tokio::task::JoinHandle;

const ROUTE_FIXTURE: &str = include_str!("fixtures/route_arbitrum_noble.json");
const MSGS_FIXTURE: &str = include_str!("fixtures/msgs_arbitrum_noble.json");

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: Option<String>,
    user_agent: Option<String>,
    bridge_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: JoinHandle<()>,
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(State(stub): State<Stub>, uri: Uri, headers: HeaderMap, body: String) -> impl IntoResponse {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    stub.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        authorization: header_str(header::AUTHORIZATION),
        user_agent: header_str(header::USER_AGENT),
        bridge_key: header_str(header::HeaderName::from_static("x-ls-apikey")),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    (stub.status, [(header::CONTENT_TYPE, "application/json")], stub.body)
}

impl StubServer {
    async fn spawn(status: StatusCode, body: &'static str) -> Self {
        Self::spawn_with_delay(status, body, Duration::ZERO).await
    }

    async fn spawn_with_delay(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stub = Stub {
            status,
            body,
            delay,
            requests: requests.clone(),
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
            requests,
            handle,
        }
    }

    fn client(&self) -> RouterClient {
        RouterClient::new(&RouterConfig::default().with_base_url(&self.base_url)).unwrap()
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn route_request() -> RouteRequest {
    RouteRequest {
        amount_in: "5000000".into(),
        source_asset_chain_id: "42161".into(),
        source_asset_denom: "0xaf88d065e77c8cc2239327c5edb3a432268e5831".into(),
        dest_asset_chain_id: "noble-1".into(),
        dest_asset_denom: "uusdc".into(),
        options: RouteOptions::default(),
    }
}

#[tokio::test]
async fn route_posts_flat_body_and_decodes_plan() {
    let server = StubServer::spawn(StatusCode::OK, ROUTE_FIXTURE).await;

    let plan = server.client().route(&route_request()).await.unwrap();
    assert_eq!(plan.operations.len(), 2);
    assert_eq!(plan.operations[0].kind(), Some("go_fast_transfer"));
    assert_eq!(plan.operations[1].to_chain_id(), Some("noble-1"));
    assert_eq!(plan.required_chain_addresses, ["42161", "osmosis-1", "noble-1"]);
    assert_eq!(plan.amount_out, "4985000");
    assert_eq!(plan.estimated_route_duration_seconds, 15);
    assert_eq!(plan.estimated_fees[0].origin_asset.as_ref().unwrap().decimals, Some(6));

    let recorded = server.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].path, ROUTE_PATH);
    let body = &recorded[0].body;
    assert_eq!(body["amount_in"], "5000000");
    assert_eq!(body["dest_asset_denom"], "uusdc");
    assert_eq!(body["go_fast"], true);
    assert_eq!(body["smart_swap_options"]["evm_swaps"], true);
    assert!(recorded[0].user_agent.as_deref().unwrap().starts_with("router-api/"));
    assert!(recorded[0].authorization.is_none());
}

#[tokio::test]
async fn api_key_goes_in_authorization_header() {
    let server = StubServer::spawn(StatusCode::OK, ROUTE_FIXTURE).await;
    let config = RouterConfig::default()
        .with_base_url(&server.base_url)
        .with_api_key("test-key");
    let client = RouterClient::new(&config).unwrap();

    client.route(&route_request()).await.unwrap();
    assert_eq!(server.recorded()[0].authorization.as_deref(), Some("test-key"));
}

#[tokio::test]
async fn msgs_echoes_operations_and_decodes_messages() {
    let server = StubServer::spawn(StatusCode::OK, MSGS_FIXTURE).await;
    let plan: RoutePlan = serde_json::from_str(ROUTE_FIXTURE).unwrap();
    let addresses = vec![
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".to_string(),
        "osmo1l8p5qxlwg52grsf63wtdtgtfzzqgjpfc526y4a".to_string(),
        "noble19rl4cm2hmr8afy4kldpxz3fka4jguq0a5rc48m".to_string(),
    ];
    let request = MsgsRequest::from_plan(&plan, addresses.clone(), 100);

    let response = server.client().msgs(&request).await.unwrap();
    let evm = response.msgs[0].evm_tx.as_ref().unwrap();
    assert_eq!(evm.chain_id, "42161");
    assert!(evm.call_data().is_some());
    assert_eq!(evm.required_erc20_approvals[0].amount, "5000000");
    assert_eq!(response.txs[0].operations_indices, [0, 1]);

    let recorded = server.recorded();
    assert_eq!(recorded[0].path, MSGS_PATH);
    let body = &recorded[0].body;
    assert_eq!(body["slippage_tolerance_percent"], "1");
    assert_eq!(body["address_list"], serde_json::json!(addresses));
    let sent_ops = body["operations"].clone();
    let fixture: Value = serde_json::from_str(ROUTE_FIXTURE).unwrap();
    assert_eq!(sent_ops, fixture["operations"]);
}

#[tokio::test]
async fn error_status_surfaces_service_message() {
    let server = StubServer::spawn(
        StatusCode::NOT_FOUND,
        r#"{"code":5,"message":"no routes found","details":[]}"#,
    )
    .await;

    let err = server.client().route(&route_request()).await.unwrap_err();
    match err {
        RouterError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no routes found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_with_plain_body_uses_text() {
    let server = StubServer::spawn(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").await;
    let err = server.client().route(&route_request()).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("upstream exploded"));
}

#[tokio::test]
async fn undecodable_success_body_is_invalid_response() {
    let server = StubServer::spawn(StatusCode::OK, r#"{"unexpected":true}"#).await;
    let err = server.client().route(&route_request()).await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidResponse(_)), "{err:?}");
}

#[tokio::test]
async fn slow_service_times_out() {
    let server =
        StubServer::spawn_with_delay(StatusCode::OK, ROUTE_FIXTURE, Duration::from_secs(5)).await;
    let config = RouterConfig::default()
        .with_base_url(&server.base_url)
        .with_timeout_ms(200);
    let client = RouterClient::new(&config).unwrap();

    let err = client.route(&route_request()).await.unwrap_err();
    assert!(matches!(err, RouterError::Timeout { timeout_ms: 200 }), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RouterConfig::default().with_base_url(format!("http://{addr}"));
    let client = RouterClient::new(&config).unwrap();
    let err = client.route(&route_request()).await.unwrap_err();
    assert!(matches!(err, RouterError::Transport(_)), "{err:?}");
}

const SWAP_BODY: &str = r#"{
  "data": {
    "swap_id": "6f1c",
    "deposit_actions": [
      { "to_address": "0x1111111111111111111111111111111111111111", "call_data": "0xdeadbeef" }
    ]
  }
}"#;

fn swap_request() -> SwapRequest {
    SwapRequest {
        source_network: "ARBITRUM_MAINNET".into(),
        destination_network: "PARADEX_MAINNET".into(),
        amount: 5.0,
        source_token: "USDC".into(),
        destination_token: "USDC".into(),
        source_address: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
        destination_address: "0x04a1b2".into(),
    }
}

#[tokio::test]
async fn swap_posts_with_bridge_key_header() {
    let server = StubServer::spawn(StatusCode::OK, SWAP_BODY).await;
    let config = SwapConfig::default()
        .with_base_url(&server.base_url)
        .with_api_key("bridge-key");
    let client = SwapClient::new(&config).unwrap();

    let response = client.create_swap(&swap_request()).await.unwrap();
    let action = response.first_action().unwrap();
    assert_eq!(action.to_address, "0x1111111111111111111111111111111111111111");
    assert_eq!(action.call_data, "0xdeadbeef");

    let recorded = server.recorded();
    assert_eq!(recorded[0].path, SWAPS_PATH);
    assert_eq!(recorded[0].bridge_key.as_deref(), Some("bridge-key"));
    assert!(recorded[0].authorization.is_none());
    assert_eq!(recorded[0].body["amount"], serde_json::json!(5.0));
    assert_eq!(recorded[0].body["source_network"], "ARBITRUM_MAINNET");
}

#[tokio::test]
async fn swap_error_surfaces_nested_message() {
    let server = StubServer::spawn(
        StatusCode::BAD_REQUEST,
        r#"{"error":{"code":"INVALID_ADDRESS","message":"destination address is invalid"}}"#,
    )
    .await;
    let client = SwapClient::new(&SwapConfig::default().with_base_url(&server.base_url)).unwrap();

    let err = client.create_swap(&swap_request()).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("destination address is invalid"), "{err}");
}
