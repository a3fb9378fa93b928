//! NEAR WalletConnect Bridge
//!
//! Remote-signer connector that lets a dApp request NEAR account access and
//! transaction signatures from a wallet over a WalletConnect session. The
//! dApp never holds key material.
//!
//! # Architecture
//!
//! This crate provides:
//! - **session**: Pairing lifecycle and the session store
//! - **tx**: Nonce and block resolution, transaction codec boundary
//! - **signature**: Normalization of wallet signature payloads
//! - **ledger**: NEAR JSON-RPC queries and submission
//! - **wallet**: The signing façade exposed to the dApp
//! - **utils**: Configuration, logging and retry helpers
//!
//! The relay transport, the pairing modal and the transaction byte format
//! are supplied by the embedder through [`PairingTransport`],
//! [`PairingModal`] and [`TransactionCodec`].
//!
//! # Example
//!
//! ```rust,ignore
//! use near_wc_bridge::{BridgeConfig, Network, TransactionParams, WalletConnectWallet};
//!
//! let config = BridgeConfig::from_env()?;
//! let wallet = WalletConnectWallet::with_rpc(transport, modal, codec, Network::Testnet, &config)?;
//!
//! let accounts = wallet.sign_in(&Network::Testnet).await?;
//! let outcome = wallet
//!     .sign_and_send_transaction(
//!         TransactionParams { receiver_id: "app.testnet".into(), actions },
//!         &Network::Testnet,
//!     )
//!     .await?;
//! ```

pub mod error;
pub mod ledger;
pub mod session;
pub mod signature;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

// Re-export key types for convenience
pub use error::{BridgeError, BridgeResult, ErrorCode};
pub use ledger::{LedgerClient, NearRpcClient};
pub use session::{
    PairingModal, PairingSession, PairingTransport, SessionManager, SessionState, SessionStore,
};
pub use signature::{normalize, normalize_batch, RawSignature, SignaturePayload};
pub use tx::{CodecError, TransactionBuilder, TransactionCodec};
pub use types::*;
pub use utils::config::BridgeConfig;
pub use utils::retry::{retry, RetryOptions};
pub use wallet::WalletConnectWallet;
