//! HTTP Client
//!
//! One pooled async client per RPC client, configured from [`BridgeConfig`].

use reqwest::Client;
use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};
use crate::utils::config::BridgeConfig;

/// Build the pooled client used for JSON-RPC calls
pub fn build_client(config: &BridgeConfig) -> BridgeResult<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(5)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| BridgeError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Host part of a URL, used to label log lines per endpoint
pub fn extract_domain(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
