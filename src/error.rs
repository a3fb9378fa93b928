//! Unified error types for the bridge
//!
//! Every component reports failures as a [`BridgeError`] so the signing
//! façade can decide on compensation (sign-out, disconnect) by error code
//! rather than by message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all bridge operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn user_cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UserCancelled, msg)
    }

    pub fn unknown_signer(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownSigner, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, msg)
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn malformed_signature(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedSignature, msg)
    }

    pub fn not_supported() -> Self {
        Self::new(ErrorCode::NotSupported, "Method not supported")
    }

    pub fn not_signed_in() -> Self {
        Self::new(ErrorCode::NotSignedIn, "Wallet not signed in")
    }

    pub fn no_session() -> Self {
        Self::new(ErrorCode::NoSession, "No active WalletConnect session")
    }

    pub fn nonce_conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NonceConflict, msg)
    }

    pub fn broadcast_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastFailed, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Whether a retry can reasonably change the outcome.
    ///
    /// User decisions, capability boundaries and semantically malformed
    /// payloads are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.code,
            ErrorCode::UserCancelled
                | ErrorCode::UnknownSigner
                | ErrorCode::NotSupported
                | ErrorCode::NotSignedIn
                | ErrorCode::MalformedSignature
                | ErrorCode::InvalidInput
        )
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for BridgeError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Pairing / session
    UserCancelled,
    NoSession,
    NotSignedIn,
    UnknownSigner,

    // Network errors
    NetworkError,
    Timeout,
    RpcError,

    // Transaction errors
    NonceConflict,
    BroadcastFailed,
    MalformedSignature,

    // Capability boundary
    NotSupported,

    // Parse errors
    InvalidInput,
    ParseError,
    JsonError,

    // Internal
    Internal,
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

// Conversions from common error types

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BridgeError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            BridgeError::new(ErrorCode::NetworkError, "Connection failed")
        } else {
            BridgeError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<bs58::decode::Error> for BridgeError {
    fn from(e: bs58::decode::Error) -> Self {
        BridgeError::new(ErrorCode::ParseError, format!("Base58 error: {}", e))
    }
}

impl From<base64::DecodeError> for BridgeError {
    fn from(e: base64::DecodeError) -> Self {
        BridgeError::new(ErrorCode::ParseError, format!("Base64 error: {}", e))
    }
}

impl From<tokio::time::error::Elapsed> for BridgeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        BridgeError::new(ErrorCode::Timeout, "Operation timed out")
    }
}
