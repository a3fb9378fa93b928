//! NEAR JSON-RPC client
//!
//! Endpoints are tried in order. Only transport failures move on to the
//! next endpoint; an error answered by a node is final for that call.

use crate::error::{BridgeError, BridgeResult, ErrorCode};
use crate::ledger::LedgerClient;
use crate::log_warn;
use crate::types::{AccessKeyView, BlockView, Finality, FinalExecutionOutcome, Network};
use crate::utils::config::{validate_endpoint, BridgeConfig};
use crate::utils::{build_client, extract_domain};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const MODULE: &str = "rpc";

/// Execution level `send_tx` waits for
const SEND_TX_WAIT_UNTIL: &str = "EXECUTED_OPTIMISTIC";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

pub struct NearRpcClient {
    client: Client,
    network: Network,
    endpoints: Vec<String>,
}

impl NearRpcClient {
    /// Client for the endpoints configured for `network`
    pub fn new(network: Network, config: &BridgeConfig) -> BridgeResult<Self> {
        let endpoints = config.rpc_endpoints(&network).to_vec();
        Self::with_endpoints(network, endpoints, config)
    }

    pub fn with_endpoints(
        network: Network,
        endpoints: Vec<String>,
        config: &BridgeConfig,
    ) -> BridgeResult<Self> {
        if endpoints.is_empty() {
            return Err(BridgeError::invalid_input(format!(
                "No RPC endpoints configured for {}",
                network
            )));
        }
        for endpoint in &endpoints {
            validate_endpoint(endpoint)?;
        }

        Ok(Self {
            client: build_client(config)?,
            network,
            endpoints,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> BridgeResult<T> {
        let mut last_error = BridgeError::network(format!("All {} RPC endpoints failed", self.network));

        for endpoint in &self.endpoints {
            match self.call_single(endpoint, method, &params).await {
                Ok(result) => {
                    return serde_json::from_value(result).map_err(|e| {
                        BridgeError::parse_error(format!("Unexpected {} result: {}", method, e))
                    });
                }
                Err(e) if e.code == ErrorCode::NetworkError => {
                    log_warn!(
                        MODULE,
                        "RPC endpoint failed",
                        endpoint = extract_domain(endpoint),
                        method = method,
                        error = e,
                    );
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    async fn call_single(&self, endpoint: &str, method: &str, params: &Value) -> BridgeResult<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: "near-wc-bridge",
            method,
            params,
        };

        let response = self.client.post(endpoint).json(&request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Nodes answer handler errors with a JSON body even on 4xx/5xx
        match serde_json::from_str::<JsonRpcResponse>(&text) {
            Ok(body) => parse_response(method, body),
            Err(_) if !status.is_success() => Err(BridgeError::network(format!(
                "RPC returned HTTP {}",
                status.as_u16()
            ))),
            Err(e) => Err(BridgeError::parse_error(format!("Invalid RPC response: {}", e))),
        }
    }
}

#[async_trait]
impl LedgerClient for NearRpcClient {
    async fn block(&self, finality: Finality) -> BridgeResult<BlockView> {
        self.call("block", json!({ "finality": finality })).await
    }

    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
        finality: Finality,
    ) -> BridgeResult<AccessKeyView> {
        self.call(
            "query",
            json!({
                "request_type": "view_access_key",
                "finality": finality,
                "account_id": account_id,
                "public_key": public_key,
            }),
        )
        .await
    }

    async fn broadcast_tx_commit(&self, signed_tx_base64: &str) -> BridgeResult<FinalExecutionOutcome> {
        self.call("broadcast_tx_commit", json!([signed_tx_base64])).await
    }

    async fn send_transaction(&self, signed_tx: &[u8]) -> BridgeResult<FinalExecutionOutcome> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(signed_tx);
        self.call(
            "send_tx",
            json!({ "signed_tx_base64": encoded, "wait_until": SEND_TX_WAIT_UNTIL }),
        )
        .await
    }
}

fn is_submission(method: &str) -> bool {
    matches!(method, "broadcast_tx_commit" | "send_tx")
}

fn parse_response(method: &str, body: JsonRpcResponse) -> BridgeResult<Value> {
    if let Some(error) = body.error {
        return Err(classify_rpc_error(method, &error));
    }

    let result = body
        .result
        .ok_or_else(|| BridgeError::rpc(format!("Empty {} response", method)))?;

    // Older nodes report query failures inside `result`
    if let Some(message) = result.get("error").and_then(Value::as_str) {
        return Err(BridgeError::rpc(format!("{} failed", method)).with_details(message));
    }

    Ok(result)
}

/// Map a JSON-RPC error object onto a bridge error
fn classify_rpc_error(method: &str, error: &Value) -> BridgeError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("RPC error");
    let cause = error.pointer("/cause/name").and_then(Value::as_str);
    let data = error
        .get("data")
        .map(|d| match d {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    // A concurrent transaction consumed the nonce this one was built with
    if error.to_string().contains("InvalidNonce") {
        return BridgeError::nonce_conflict("Transaction nonce rejected").with_details(data);
    }

    match cause {
        Some("TIMEOUT_ERROR") => BridgeError::timeout(format!("{} timed out on the node", method)),
        Some("INVALID_TRANSACTION") => {
            BridgeError::broadcast_failed("Transaction rejected").with_details(data)
        }
        Some(name) if is_submission(method) => BridgeError::broadcast_failed(message).with_details(name),
        Some(name) => BridgeError::rpc(message).with_details(name),
        None if is_submission(method) => BridgeError::broadcast_failed(message).with_details(data),
        None => BridgeError::rpc(message).with_details(data),
    }
}
