//! Shared types for the bridge
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization over the pairing channel and the RPC.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain namespace used for every WalletConnect proposal
pub const NEAR_NAMESPACE: &str = "near";

// =============================================================================
// Network
// =============================================================================

/// NEAR network a session is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    Custom(String),
}

impl Network {
    pub fn as_str(&self) -> &str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Custom(name) => name,
        }
    }

    /// WalletConnect chain id, e.g. `near:testnet`
    pub fn chain_id(&self) -> String {
        format!("{}:{}", NEAR_NAMESPACE, self.as_str())
    }

    /// Prefix of session-scoped account ids, e.g. `near:testnet:`
    pub fn account_prefix(&self) -> String {
        format!("{}:{}:", NEAR_NAMESPACE, self.as_str())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.contains(':') {
            return Err(BridgeError::invalid_input(format!("Invalid network name: {:?}", s)));
        }
        Ok(match name {
            "mainnet" => Network::Mainnet,
            "testnet" => Network::Testnet,
            other => Network::Custom(other.to_string()),
        })
    }
}

impl Serialize for Network {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Accounts & Keys
// =============================================================================

/// An account authorized by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    /// Empty when the remote signer does not expose the key
    #[serde(default)]
    pub public_key: String,
}

impl Account {
    pub fn new(account_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            public_key: public_key.into(),
        }
    }
}

/// Curve of a NEAR public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    Secp256k1,
}

impl KeyType {
    fn key_len(&self) -> usize {
        match self {
            KeyType::Ed25519 => 32,
            KeyType::Secp256k1 => 64,
        }
    }
}

/// Parsed NEAR public key (`ed25519:<base58>` / `secp256k1:<base58>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub key_type: KeyType,
    pub data: Vec<u8>,
}

impl FromStr for PublicKey {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Keys without a curve prefix are ed25519
        let (key_type, encoded) = match s.split_once(':') {
            Some(("ed25519", rest)) => (KeyType::Ed25519, rest),
            Some(("secp256k1", rest)) => (KeyType::Secp256k1, rest),
            Some((other, _)) => {
                return Err(BridgeError::invalid_input(format!("Unknown key type: {}", other)))
            }
            None => (KeyType::Ed25519, s),
        };

        let data = bs58::decode(encoded).into_vec()?;
        if data.len() != key_type.key_len() {
            return Err(BridgeError::invalid_input(format!(
                "Invalid {:?} public key length: {}",
                key_type,
                data.len()
            )));
        }

        if key_type == KeyType::Ed25519 {
            let bytes: [u8; 32] = data
                .as_slice()
                .try_into()
                .map_err(|_| BridgeError::invalid_input("Invalid ed25519 key"))?;
            ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                .map_err(|e| BridgeError::invalid_input(format!("Invalid ed25519 key: {}", e)))?;
        }

        Ok(Self { key_type, data })
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.key_type {
            KeyType::Ed25519 => "ed25519",
            KeyType::Secp256k1 => "secp256k1",
        };
        write!(f, "{}:{}", prefix, bs58::encode(&self.data).into_string())
    }
}

// =============================================================================
// Chain State
// =============================================================================

/// Finality tag for ledger queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Finality {
    Optimistic,
    NearFinal,
    Final,
}

/// 32-byte block hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CryptoHash(pub [u8; 32]);

impl CryptoHash {
    pub fn from_base58(encoded: &str) -> BridgeResult<Self> {
        let bytes = bs58::decode(encoded).into_vec()?;
        let hash: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            BridgeError::parse_error(format!("Block hash must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(hash))
    }
}

impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeaderView {
    pub hash: String,
    #[serde(default)]
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockView {
    pub header: BlockHeaderView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    #[serde(default)]
    pub block_hash: Option<String>,
}

// =============================================================================
// Transactions
// =============================================================================

/// Domain action, opaque to the bridge beyond being encodable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub serde_json::Value);

/// Transaction requested by the caller, before chain state is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub signer_id: String,
    pub receiver_id: String,
    pub actions: Vec<Action>,
}

/// Receiver and actions of one transaction in a sign-and-send call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub receiver_id: String,
    pub actions: Vec<Action>,
}

/// A transaction with resolved nonce and block reference, ready to encode
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEnvelope {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub receiver_id: String,
    pub nonce: u64,
    pub actions: Vec<Action>,
    pub block_hash: CryptoHash,
}

/// Final execution outcome as returned by the RPC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalExecutionOutcome(pub serde_json::Value);

impl FinalExecutionOutcome {
    pub fn transaction_hash(&self) -> Option<&str> {
        self.0
            .pointer("/transaction/hash")
            .or_else(|| self.0.pointer("/transaction_outcome/id"))
            .and_then(|v| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        match self.0.get("status") {
            Some(serde_json::Value::Object(status)) => {
                status.contains_key("SuccessValue") || status.contains_key("SuccessReceiptId")
            }
            _ => false,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Parameters of a `near_signMessage` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageParams {
    pub message: String,
    pub nonce: Vec<u8>,
    pub recipient: String,
    /// Omitted from the request when `None` or empty
    #[serde(skip_serializing_if = "is_blank")]
    pub callback_url: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

impl SignMessageParams {
    /// Build params with a fresh random 32-byte nonce
    pub fn new(message: impl Into<String>, recipient: impl Into<String>) -> Self {
        use rand::RngCore;

        let mut nonce = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        Self {
            message: message.into(),
            nonce,
            recipient: recipient.into(),
            callback_url: None,
        }
    }
}

/// Wallet response to `near_signMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    pub account_id: String,
    pub public_key: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
