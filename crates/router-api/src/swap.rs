//! Client for the bridge service that forwards funds out of the source
//! wallet after a deposit lands there.

use async_trait::async_trait;
use reqwest::header::HeaderName;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::client::JsonHttp;
use crate::config::{clone_secret, deserialize_api_key, validate_endpoint, DEFAULT_TIMEOUT_MS};
use crate::error::{RouterError, RouterResult};

pub const SWAPS_PATH: &str = "/api/v2/swaps";
pub const DEFAULT_SWAP_BASE_URL: &str = "https://api.layerswap.io";

/// Header carrying the bridge API key.
const API_KEY_HEADER: &str = "x-ls-apikey";

/// Connection settings for the bridge service.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_api_key")]
    pub api_key: Option<SecretString>,
    pub request_timeout_ms: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SWAP_BASE_URL.into(),
            api_key: None,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Clone for SwapConfig {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            api_key: clone_secret(&self.api_key),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

impl SwapConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        self.api_key = (!key.is_empty()).then(|| SecretString::from(key));
        self
    }

    pub fn validate(&self) -> RouterResult<()> {
        validate_endpoint(&self.base_url, self.request_timeout_ms)
    }
}

/// Body of `POST /api/v2/swaps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub source_network: String,
    pub destination_network: String,
    /// Human-unit amount; the service takes a JSON number here.
    pub amount: f64,
    pub source_token: String,
    pub destination_token: String,
    pub source_address: String,
    pub destination_address: String,
}

/// A transaction the source wallet must send to fund the swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAction {
    pub to_address: String,
    pub call_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in_base_units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_id: Option<String>,
    #[serde(default)]
    pub deposit_actions: Vec<DepositAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    pub data: SwapData,
}

impl SwapResponse {
    /// First deposit action, which is the one the source wallet sends.
    pub fn first_action(&self) -> RouterResult<&DepositAction> {
        self.data
            .deposit_actions
            .first()
            .ok_or_else(|| RouterError::InvalidResponse("swap has no deposit actions".into()))
    }
}

/// Creates bridge swaps.
#[async_trait]
pub trait SwapService: Send + Sync {
    async fn create_swap(&self, request: &SwapRequest) -> RouterResult<SwapResponse>;
}

/// HTTP implementation of [`SwapService`].
#[derive(Debug, Clone)]
pub struct SwapClient {
    http: JsonHttp,
}

impl SwapClient {
    pub fn new(config: &SwapConfig) -> RouterResult<Self> {
        config.validate()?;
        let http = JsonHttp::new(
            &config.base_url,
            config.api_key.as_ref(),
            HeaderName::from_static(API_KEY_HEADER),
            config.request_timeout_ms,
        )?;
        Ok(Self { http })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

#[async_trait]
impl SwapService for SwapClient {
    async fn create_swap(&self, request: &SwapRequest) -> RouterResult<SwapResponse> {
        self.http.post(SWAPS_PATH, request).await
    }
}
