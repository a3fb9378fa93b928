//! Bridge Configuration
//!
//! Defaults suit a browser-hosted dApp talking to the public NEAR RPCs.
//! Environment variables override them:
//! - `NEAR_WC_RPC_MAINNET` / `NEAR_WC_RPC_TESTNET`: comma-separated RPC URLs
//! - `NEAR_WC_PAIRING_TIMEOUT_SECS`: upper bound on the pairing wait

use crate::error::{BridgeError, BridgeResult};
use crate::types::Network;
use crate::utils::retry::RetryOptions;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Runtime configuration for the session manager, builder and RPC client
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How often the pairing loop asks the transport for a session
    pub poll_interval: Duration,
    /// Hard upper bound on waiting for the wallet to approve pairing
    pub pairing_timeout: Duration,
    /// Policy for ledger reads and read-only signer calls
    pub retry: RetryOptions,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// RPC endpoints per network, tried in order
    rpc_endpoints: HashMap<Network, Vec<String>>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let mut rpc_endpoints = HashMap::new();
        rpc_endpoints.insert(
            Network::Mainnet,
            vec![
                "https://rpc.mainnet.near.org".to_string(),
                "https://free.rpc.fastnear.com".to_string(),
            ],
        );
        rpc_endpoints.insert(
            Network::Testnet,
            vec![
                "https://rpc.testnet.near.org".to_string(),
                "https://test.rpc.fastnear.com".to_string(),
            ],
        );

        Self {
            poll_interval: Duration::from_secs(1),
            pairing_timeout: Duration::from_secs(5 * 60),
            retry: RetryOptions::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("near-wc-bridge/{}", env!("CARGO_PKG_VERSION")),
            rpc_endpoints,
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `NEAR_WC_*` environment variables
    pub fn from_env() -> BridgeResult<Self> {
        let mut config = Self::default();

        for (var, network) in [
            ("NEAR_WC_RPC_MAINNET", Network::Mainnet),
            ("NEAR_WC_RPC_TESTNET", Network::Testnet),
        ] {
            if let Ok(list) = std::env::var(var) {
                let urls = split_endpoints(&list);
                if !urls.is_empty() {
                    config.set_rpc_endpoints(network, urls);
                }
            }
        }

        if let Ok(secs) = std::env::var("NEAR_WC_PAIRING_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                BridgeError::invalid_input(format!("NEAR_WC_PAIRING_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.pairing_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn rpc_endpoints(&self, network: &Network) -> &[String] {
        self.rpc_endpoints
            .get(network)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_rpc_endpoints(&mut self, network: Network, urls: Vec<String>) {
        self.rpc_endpoints.insert(network, urls);
    }

    pub fn with_pairing_timeout(mut self, timeout: Duration) -> Self {
        self.pairing_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Reject settings that would hang or leak traffic over plain HTTP
    pub fn validate(&self) -> BridgeResult<()> {
        if self.poll_interval.is_zero() {
            return Err(BridgeError::invalid_input("poll_interval must be non-zero"));
        }
        if self.pairing_timeout < self.poll_interval {
            return Err(BridgeError::invalid_input(
                "pairing_timeout must be at least one poll_interval",
            ));
        }
        if self.retry.retries == 0 {
            return Err(BridgeError::invalid_input("retry.retries must be at least 1"));
        }

        for (network, urls) in &self.rpc_endpoints {
            for url in urls {
                validate_endpoint(url).map_err(|e| e.with_details(format!("network {}", network)))?;
            }
        }
        Ok(())
    }
}

fn split_endpoints(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// HTTPS required except for local development hosts
pub fn validate_endpoint(url: &str) -> BridgeResult<()> {
    let parsed = Url::parse(url)
        .map_err(|e| BridgeError::invalid_input(format!("Invalid RPC URL {}: {}", url, e)))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => match parsed.host_str() {
            Some("localhost") | Some("127.0.0.1") | Some("[::1]") => Ok(()),
            _ => Err(BridgeError::invalid_input(format!(
                "HTTPS required for remote endpoint {}",
                url
            ))),
        },
        other => Err(BridgeError::invalid_input(format!(
            "Unsupported URL scheme {} in {}",
            other, url
        ))),
    }
}
