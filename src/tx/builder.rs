//! Transaction Builder
//!
//! Turns [`TransactionRequest`]s into [`TransactionEnvelope`]s by resolving
//! the signer's public key from the session, its access-key nonce and a
//! recent final block hash.
//!
//! Nonces in a batch are assigned by position: the `i`-th transaction gets
//! `access_key_nonce + i + 1`, so the wallet can sign them all at once and
//! they can be submitted back to back.

use crate::error::{BridgeError, BridgeResult};
use crate::ledger::LedgerClient;
use crate::log_debug;
use crate::session::{SessionManager, NEAR_GET_ACCOUNTS};
use crate::types::*;
use crate::utils::retry::{retry, RetryOptions};
use serde_json::json;
use std::sync::Arc;

const MODULE: &str = "tx_builder";

pub struct TransactionBuilder {
    session: Arc<SessionManager>,
    ledger: Arc<dyn LedgerClient>,
    retry: RetryOptions,
}

impl TransactionBuilder {
    pub fn new(session: Arc<SessionManager>, ledger: Arc<dyn LedgerClient>, retry: RetryOptions) -> Self {
        Self {
            session,
            ledger,
            retry,
        }
    }

    /// Resolve a single transaction
    pub async fn build_one(
        &self,
        request: TransactionRequest,
        network: &Network,
    ) -> BridgeResult<TransactionEnvelope> {
        let accounts = self.fetch_accounts(network).await?;
        let public_key = find_signer(&accounts, &request.signer_id)?;

        let (block, access_key) = tokio::try_join!(
            self.final_block(),
            self.access_key(&request.signer_id, &public_key),
        )?;

        let block_hash = CryptoHash::from_base58(&block.header.hash)?;
        envelope(request, public_key, access_key.nonce, 0, block_hash)
    }

    /// Resolve transactions that will be signed together.
    ///
    /// Block and accounts are fetched once; access keys once per
    /// transaction, in order.
    pub async fn build_batch(
        &self,
        requests: Vec<TransactionRequest>,
        network: &Network,
    ) -> BridgeResult<Vec<TransactionEnvelope>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let (block, accounts) = tokio::try_join!(self.final_block(), self.fetch_accounts(network))?;
        let block_hash = CryptoHash::from_base58(&block.header.hash)?;

        let mut envelopes = Vec::with_capacity(requests.len());
        for (position, request) in requests.into_iter().enumerate() {
            let public_key = find_signer(&accounts, &request.signer_id)?;
            let access_key = self.access_key(&request.signer_id, &public_key).await?;
            envelopes.push(envelope(
                request,
                public_key,
                access_key.nonce,
                position as u64,
                block_hash,
            )?);
        }

        Ok(envelopes)
    }

    /// Accounts the wallet currently exposes, with their public keys
    async fn fetch_accounts(&self, network: &Network) -> BridgeResult<Vec<Account>> {
        let session = &self.session;
        let value = retry(
            move || session.request(NEAR_GET_ACCOUNTS, json!({}), network),
            self.retry,
        )
        .await?;

        serde_json::from_value(value).map_err(|e| {
            BridgeError::parse_error(format!("Unexpected {} result: {}", NEAR_GET_ACCOUNTS, e))
        })
    }

    async fn final_block(&self) -> BridgeResult<BlockView> {
        let ledger = &self.ledger;
        retry(move || ledger.block(Finality::Final), self.retry).await
    }

    async fn access_key(&self, account_id: &str, public_key: &PublicKey) -> BridgeResult<AccessKeyView> {
        let ledger = &self.ledger;
        let public_key = public_key.to_string();
        let public_key = public_key.as_str();
        retry(
            move || ledger.view_access_key(account_id, public_key, Finality::Final),
            self.retry,
        )
        .await
    }
}

fn find_signer(accounts: &[Account], signer_id: &str) -> BridgeResult<PublicKey> {
    let account = accounts
        .iter()
        .find(|a| a.account_id == signer_id)
        .ok_or_else(|| {
            BridgeError::unknown_signer("Invalid signer id")
                .with_details(format!("{} is not exposed by the wallet", signer_id))
        })?;

    account.public_key.parse().map_err(|e: BridgeError| {
        BridgeError::unknown_signer(format!("No usable public key for {}", signer_id))
            .with_details(e.message)
    })
}

fn envelope(
    request: TransactionRequest,
    public_key: PublicKey,
    access_key_nonce: u64,
    position: u64,
    block_hash: CryptoHash,
) -> BridgeResult<TransactionEnvelope> {
    let nonce = access_key_nonce
        .checked_add(position)
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| BridgeError::invalid_input("Access key nonce exhausted"))?;

    log_debug!(
        MODULE,
        "Resolved transaction",
        signer_id = request.signer_id,
        receiver_id = request.receiver_id,
        nonce = nonce,
        block_hash = block_hash,
    );

    Ok(TransactionEnvelope {
        signer_id: request.signer_id,
        public_key,
        receiver_id: request.receiver_id,
        nonce,
        actions: request.actions,
        block_hash,
    })
}
