//! WalletConnect pairing transport boundary
//!
//! Wire types follow the WalletConnect v2 sign data structures; the relay,
//! encryption and session persistence live behind [`PairingTransport`].

use crate::error::BridgeResult;
use crate::types::{Network, NEAR_NAMESPACE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const NEAR_SIGN_IN: &str = "near_signIn";
pub const NEAR_SIGN_OUT: &str = "near_signOut";
pub const NEAR_GET_ACCOUNTS: &str = "near_getAccounts";
pub const NEAR_SIGN_TRANSACTION: &str = "near_signTransaction";
pub const NEAR_SIGN_TRANSACTIONS: &str = "near_signTransactions";
pub const NEAR_SIGN_MESSAGE: &str = "near_signMessage";

/// Methods requested in every pairing proposal
pub const WC_METHODS: [&str; 6] = [
    NEAR_SIGN_IN,
    NEAR_SIGN_OUT,
    NEAR_GET_ACCOUNTS,
    NEAR_SIGN_TRANSACTION,
    NEAR_SIGN_TRANSACTIONS,
    NEAR_SIGN_MESSAGE,
];

/// Events the wallet may emit; documented, not consumed
pub const WC_EVENTS: [&str; 2] = ["chainChanged", "accountsChanged"];

/// Reason code WalletConnect reserves for a user-initiated disconnect
pub const USER_DISCONNECTED_CODE: i64 = 5900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeNamespace {
    pub chains: Vec<String>,
    pub methods: Vec<String>,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub required_namespaces: BTreeMap<String, ProposeNamespace>,
}

impl ConnectParams {
    /// Proposal for the `near` namespace scoped to one network
    pub fn near(network: &Network) -> Self {
        let mut required_namespaces = BTreeMap::new();
        required_namespaces.insert(
            NEAR_NAMESPACE.to_string(),
            ProposeNamespace {
                chains: vec![network.chain_id()],
                methods: WC_METHODS.iter().map(|m| m.to_string()).collect(),
                events: WC_EVENTS.iter().map(|e| e.to_string()).collect(),
            },
        );
        Self { required_namespaces }
    }
}

/// Pairing URI to show the user, plus the pending topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingProposal {
    pub uri: String,
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SettleNamespace {
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chains: Option<Vec<String>>,
}

/// Settled session as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStruct {
    pub topic: String,
    pub namespaces: BTreeMap<String, SettleNamespace>,
    /// Unix seconds
    #[serde(default)]
    pub expiry: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestArguments {
    pub topic: String,
    pub chain_id: String,
    pub request: RpcRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectReason {
    pub code: i64,
    pub message: String,
}

impl DisconnectReason {
    pub fn user_disconnected() -> Self {
        Self {
            code: USER_DISCONNECTED_CODE,
            message: "User disconnected".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectParams {
    pub topic: String,
    pub reason: DisconnectReason,
}

/// Relay client owning the encrypted channel to the wallet
#[async_trait]
pub trait PairingTransport: Send + Sync {
    /// Propose a session; the wallet approves it out of band
    async fn connect(&self, params: ConnectParams) -> BridgeResult<PairingProposal>;

    /// Send a JSON-RPC request over a settled session
    async fn request(&self, args: RequestArguments) -> BridgeResult<Value>;

    /// Currently settled session, if any
    async fn get_session(&self) -> BridgeResult<Option<SessionStruct>>;

    async fn disconnect(&self, params: DisconnectParams) -> BridgeResult<()>;
}
