use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{RouterError, RouterResult};

pub const DEFAULT_BASE_URL: &str = "https://go.cosmos.network/api/skip";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Connection settings for the routing service.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub base_url: String,
    /// Sent verbatim in the `authorization` header when present.
    #[serde(deserialize_with = "deserialize_api_key")]
    pub api_key: Option<SecretString>,
    pub request_timeout_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Clone for RouterConfig {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            api_key: clone_secret(&self.api_key),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

impl RouterConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        self.api_key = (!key.is_empty()).then(|| SecretString::from(key));
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> RouterResult<()> {
        validate_endpoint(&self.base_url, self.request_timeout_ms)
    }
}

pub(crate) fn validate_endpoint(base_url: &str, timeout_ms: u64) -> RouterResult<()> {
    let base = base_url.trim();
    if base.is_empty() {
        return Err(RouterError::Config("base_url is empty".into()));
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(RouterError::Config(format!(
            "base_url must be http(s): {base}"
        )));
    }
    if timeout_ms == 0 {
        return Err(RouterError::Config("request_timeout_ms must be positive".into()));
    }
    Ok(())
}

pub(crate) fn clone_secret(key: &Option<SecretString>) -> Option<SecretString> {
    key.as_ref()
        .map(|key| SecretString::from(key.expose_secret().to_owned()))
}

pub(crate) fn deserialize_api_key<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|key| !key.is_empty()).map(SecretString::from))
}
