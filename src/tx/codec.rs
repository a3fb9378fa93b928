//! Transaction codec boundary
//!
//! The byte layout of NEAR transactions and actions is owned by the
//! embedding application. The bridge only needs two things from it.

use crate::error::BridgeError;
use crate::types::TransactionEnvelope;

/// Error types for transaction encoding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Invalid signed transaction: {0}")]
    InvalidSignedTransaction(String),
}

impl From<CodecError> for BridgeError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidSignedTransaction(reason) => {
                BridgeError::malformed_signature("Wallet returned an invalid signed transaction")
                    .with_details(reason)
            }
            other => BridgeError::invalid_input(other.to_string()),
        }
    }
}

pub trait TransactionCodec: Send + Sync {
    /// Serialize an unsigned transaction for the wallet to sign
    fn encode_transaction(&self, tx: &TransactionEnvelope) -> Result<Vec<u8>, CodecError>;

    /// Check that normalized bytes decode as a signed transaction
    fn verify_signed(&self, signed_tx: &[u8]) -> Result<(), CodecError>;
}
