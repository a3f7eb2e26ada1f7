use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::error::{RouterError, RouterResult};
use crate::models::{ApiErrorBody, MsgsRequest, MsgsResponse, RoutePlan, RouteRequest};

pub const ROUTE_PATH: &str = "/v2/fungible/route";
pub const MSGS_PATH: &str = "/v2/fungible/msgs";

/// Longest error body echoed back in a [`RouterError::Status`] message.
const MAX_ERROR_BODY: usize = 512;

/// The two routing-service calls a deposit needs.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Resolves a multi-hop route between two assets.
    async fn route(&self, request: &RouteRequest) -> RouterResult<RoutePlan>;

    /// Turns a resolved route into executable messages.
    async fn msgs(&self, request: &MsgsRequest) -> RouterResult<MsgsResponse>;
}

/// JSON-over-HTTPS transport shared by the service clients.
#[derive(Debug, Clone)]
pub(crate) struct JsonHttp {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl JsonHttp {
    /// Builds the transport, sending `api_key` under `key_header` when set.
    pub(crate) fn new(
        base_url: &str,
        api_key: Option<&SecretString>,
        key_header: HeaderName,
        timeout_ms: u64,
    ) -> RouterResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("router-api/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key.expose_secret())
                .map_err(|_| RouterError::Config("api_key is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(key_header, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout_ms,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, err: reqwest::Error) -> RouterError {
        if err.is_timeout() {
            RouterError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            RouterError::Transport(err)
        }
    }

    pub(crate) async fn post<B, R>(&self, path: &str, body: &B) -> RouterResult<R>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "posting to service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(&text)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "unknown error".into());
            warn!(path, status = status.as_u16(), %message, "service rejected request");
            return Err(RouterError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(path, error = %e, "service returned an undecodable body");
            RouterError::InvalidResponse(format!("{path}: {e}"))
        })
    }
}

/// HTTP implementation of [`RoutingService`].
#[derive(Debug, Clone)]
pub struct RouterClient {
    http: JsonHttp,
}

impl RouterClient {
    pub fn new(config: &RouterConfig) -> RouterResult<Self> {
        config.validate()?;
        let http = JsonHttp::new(
            &config.base_url,
            config.api_key.as_ref(),
            AUTHORIZATION,
            config.request_timeout_ms,
        )?;
        Ok(Self { http })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

/// Service message from an error body, falling back to the raw text.
fn error_message(body: &str) -> Option<String> {
    if let Some(message) = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(ApiErrorBody::into_message)
    {
        return Some(message);
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_ERROR_BODY).collect())
}

#[async_trait]
impl RoutingService for RouterClient {
    async fn route(&self, request: &RouteRequest) -> RouterResult<RoutePlan> {
        self.http.post(ROUTE_PATH, request).await
    }

    async fn msgs(&self, request: &MsgsRequest) -> RouterResult<MsgsResponse> {
        self.http.post(MSGS_PATH, request).await
    }
}
