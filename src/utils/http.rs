//! HTTP Client Construction
//!
//! Builds the pooled async client used to reach issuers from a
//! [`MintConfig`](super::network_config::MintConfig).

use reqwest::Client;
use std::time::Duration;

use super::network_config::MintConfig;
use crate::error::{WalletError, WalletResult};

/// Build an HTTP client honoring the configured timeouts and user agent
pub fn build_client(config: &MintConfig) -> WalletResult<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(5)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| WalletError::network_error(format!("Failed to create HTTP client: {}", e)))
}

/// Host (and port) part of a URL, used to label log lines
pub fn extract_domain(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
