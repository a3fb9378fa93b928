//! Ledger Queries
//!
//! Read access to chain state (blocks, access keys) and transaction
//! submission. [`NearRpcClient`] is the JSON-RPC implementation; tests and
//! embedders can supply their own [`LedgerClient`].

mod rpc;

pub use rpc::*;

use crate::error::BridgeResult;
use crate::types::{AccessKeyView, BlockView, Finality, FinalExecutionOutcome};
use async_trait::async_trait;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Latest block at the given finality
    async fn block(&self, finality: Finality) -> BridgeResult<BlockView>;

    /// Access key of `account_id` for `public_key` (`ed25519:...`)
    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
        finality: Finality,
    ) -> BridgeResult<AccessKeyView>;

    /// Submit a base64-encoded signed transaction and wait for its outcome
    async fn broadcast_tx_commit(&self, signed_tx_base64: &str) -> BridgeResult<FinalExecutionOutcome>;

    /// Submit signed transaction bytes and wait for optimistic execution
    async fn send_transaction(&self, signed_tx: &[u8]) -> BridgeResult<FinalExecutionOutcome>;
}
