//! HTTP client construction
//!
//! Builds clients for the onion meta-tag fallback fetch. Traffic may
//! optionally be routed through a SOCKS5h proxy such as a local Tor daemon.

use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;

use stn_core::DEFAULT_TIMEOUT_SECS;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Optional proxy URL, e.g. `socks5h://127.0.0.1:9050`
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent override; [`DEFAULT_USER_AGENT`] when unset
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }
}

/// Errors from page fetches
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Document is empty: {0}")]
    EmptyDocument(String),
}

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("stn-scan/", env!("CARGO_PKG_VERSION"));

/// Create an HTTP client from configuration
pub fn create_client(config: &HttpConfig) -> Result<Client, FetchError> {
    let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(user_agent);

    if let Some(proxy_url) = &config.proxy {
        let proxy = Proxy::all(proxy_url).map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| FetchError::ClientBuild(e.to_string()))
}
