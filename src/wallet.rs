//! WalletConnect Signing Façade
//!
//! Wallet-selector style API over a remote signer. Keys never leave the
//! wallet: every signature is requested over the pairing session and the
//! returned bytes are broadcast from here.
//!
//! Operations that need key material the remote signer does not expose
//! fail with `NotSupported`.

use crate::error::{BridgeError, BridgeResult};
use crate::ledger::{LedgerClient, NearRpcClient};
use crate::session::*;
use crate::signature;
use crate::tx::{TransactionBuilder, TransactionCodec};
use crate::types::*;
use crate::utils::config::BridgeConfig;
use crate::{log_debug, log_info, log_warn};
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MODULE: &str = "wallet";

pub struct WalletConnectWallet {
    session: Arc<SessionManager>,
    builder: TransactionBuilder,
    ledger: Arc<dyn LedgerClient>,
    codec: Arc<dyn TransactionCodec>,
}

impl WalletConnectWallet {
    pub fn new(
        transport: Arc<dyn PairingTransport>,
        modal: Arc<dyn PairingModal>,
        ledger: Arc<dyn LedgerClient>,
        codec: Arc<dyn TransactionCodec>,
        config: &BridgeConfig,
    ) -> Self {
        Self::with_store(transport, modal, ledger, codec, Arc::new(SessionStore::new()), config)
    }

    /// Like [`new`](Self::new) with a caller-owned session store
    pub fn with_store(
        transport: Arc<dyn PairingTransport>,
        modal: Arc<dyn PairingModal>,
        ledger: Arc<dyn LedgerClient>,
        codec: Arc<dyn TransactionCodec>,
        store: Arc<SessionStore>,
        config: &BridgeConfig,
    ) -> Self {
        let session = Arc::new(SessionManager::new(transport, modal, store, config));
        let builder = TransactionBuilder::new(Arc::clone(&session), Arc::clone(&ledger), config.retry);

        Self {
            session,
            builder,
            ledger,
            codec,
        }
    }

    /// Wallet backed by the configured JSON-RPC endpoints for `network`
    pub fn with_rpc(
        transport: Arc<dyn PairingTransport>,
        modal: Arc<dyn PairingModal>,
        codec: Arc<dyn TransactionCodec>,
        network: Network,
        config: &BridgeConfig,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let ledger = Arc::new(NearRpcClient::new(network, config)?);
        Ok(Self::new(transport, modal, ledger, codec, config))
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Pair with a wallet and return the authorized accounts.
    ///
    /// An existing session is disconnected first. On failure the wallet is
    /// signed out best-effort and the original error is returned.
    pub async fn sign_in(&self, network: &Network) -> BridgeResult<Vec<Account>> {
        self.sign_in_with_cancel(network, &CancellationToken::new()).await
    }

    pub async fn sign_in_with_cancel(
        &self,
        network: &Network,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<Account>> {
        match self.try_sign_in(network, cancel).await {
            Ok(accounts) => {
                log_info!(MODULE, "Signed in", network = network, accounts = accounts.len());
                Ok(accounts)
            }
            Err(e) => {
                log_warn!(MODULE, "Sign-in failed", network = network, error = e);
                self.clean_up_failed_sign_in(network).await;
                Err(e)
            }
        }
    }

    async fn try_sign_in(&self, network: &Network, cancel: &CancellationToken) -> BridgeResult<Vec<Account>> {
        // One session at a time; accounts never accumulate across sign-ins.
        // Expired sessions still on the relay are torn down as well.
        self.session.disconnect().await?;
        self.session.connect_with_cancel(network, cancel).await?;
        self.get_accounts(network).await
    }

    async fn clean_up_failed_sign_in(&self, network: &Network) {
        if let Err(e) = self.sign_out(network).await {
            log_warn!(MODULE, "Sign-out after failed sign-in failed", error = e);
            if let Err(e) = self.session.disconnect().await {
                log_warn!(MODULE, "Disconnect after failed sign-in failed", error = e);
            }
        }
        self.session.store().clear();
    }

    /// Ask the wallet to forget the accounts, then disconnect.
    /// Without a session this does nothing.
    pub async fn sign_out(&self, network: &Network) -> BridgeResult<()> {
        let Some(session) = self.session.get_session().await? else {
            return Ok(());
        };

        let accounts = session.accounts_for(network);
        self.session
            .request(NEAR_SIGN_OUT, json!({ "accounts": accounts }), network)
            .await?;
        self.session.disconnect().await?;

        log_info!(MODULE, "Signed out", network = network);
        Ok(())
    }

    /// Authorized accounts; empty without a session
    pub async fn get_accounts(&self, network: &Network) -> BridgeResult<Vec<Account>> {
        Ok(self
            .session
            .get_session()
            .await?
            .map(|session| session.accounts_for(network))
            .unwrap_or_default())
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Sign an off-chain message, pairing first if needed.
    /// Any failure disconnects the session.
    pub async fn sign_message(
        &self,
        params: SignMessageParams,
        network: &Network,
    ) -> BridgeResult<SignedMessage> {
        match self.try_sign_message(params, network).await {
            Ok(signed) => Ok(signed),
            Err(e) => {
                log_warn!(MODULE, "Message signing failed", error = e);
                if let Err(cleanup) = self.session.disconnect().await {
                    log_warn!(MODULE, "Disconnect after failed signing failed", error = cleanup);
                }
                Err(e)
            }
        }
    }

    async fn try_sign_message(
        &self,
        params: SignMessageParams,
        network: &Network,
    ) -> BridgeResult<SignedMessage> {
        if self.session.get_session().await?.is_none() {
            self.session.connect(network).await?;
        }

        let value = self
            .session
            .request(NEAR_SIGN_MESSAGE, serde_json::to_value(&params)?, network)
            .await?;

        serde_json::from_value(value).map_err(|e| {
            BridgeError::parse_error(format!("Unexpected {} result: {}", NEAR_SIGN_MESSAGE, e))
        })
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Sign one transaction from the first authorized account and wait
    /// for its final outcome.
    pub async fn sign_and_send_transaction(
        &self,
        params: TransactionParams,
        network: &Network,
    ) -> BridgeResult<FinalExecutionOutcome> {
        let signer_id = self.default_signer(network).await?;

        let envelope = self
            .builder
            .build_one(
                TransactionRequest {
                    signer_id,
                    receiver_id: params.receiver_id,
                    actions: params.actions,
                },
                network,
            )
            .await?;

        let unsigned = self.codec.encode_transaction(&envelope)?;
        let result = self
            .session
            .request(NEAR_SIGN_TRANSACTION, json!({ "transaction": unsigned }), network)
            .await?;

        let signed = signature::normalize(result)?;
        self.codec.verify_signed(&signed)?;

        log_info!(
            MODULE,
            "Broadcasting transaction",
            signer_id = envelope.signer_id,
            receiver_id = envelope.receiver_id,
            nonce = envelope.nonce,
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(&signed);
        let outcome = self.ledger.broadcast_tx_commit(&encoded).await?;

        log_info!(
            MODULE,
            "Transaction executed",
            tx_hash = outcome.transaction_hash().unwrap_or("unknown"),
            success = outcome.is_success(),
        );
        Ok(outcome)
    }

    /// Sign a batch with a single wallet approval, then submit the signed
    /// transactions one at a time in input order.
    ///
    /// Nonces are consecutive in input order, so submission must not be
    /// reordered or run concurrently.
    pub async fn sign_and_send_transactions(
        &self,
        transactions: Vec<TransactionParams>,
        network: &Network,
    ) -> BridgeResult<Vec<FinalExecutionOutcome>> {
        let signer_id = self.default_signer(network).await?;

        let requests = transactions
            .into_iter()
            .map(|tx| TransactionRequest {
                signer_id: signer_id.clone(),
                receiver_id: tx.receiver_id,
                actions: tx.actions,
            })
            .collect();

        let envelopes = self.builder.build_batch(requests, network).await?;
        if envelopes.is_empty() {
            return Ok(Vec::new());
        }

        let unsigned = envelopes
            .iter()
            .map(|envelope| self.codec.encode_transaction(envelope))
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .session
            .request(NEAR_SIGN_TRANSACTIONS, json!({ "transactions": unsigned }), network)
            .await?;

        let signed = signature::normalize_batch(result)?;
        if signed.len() != envelopes.len() {
            return Err(BridgeError::malformed_signature("Signed transaction count mismatch")
                .with_details(format!("expected {}, got {}", envelopes.len(), signed.len())));
        }
        for bytes in &signed {
            self.codec.verify_signed(bytes)?;
        }

        let mut outcomes = Vec::with_capacity(signed.len());
        for (envelope, bytes) in envelopes.iter().zip(&signed) {
            log_info!(
                MODULE,
                "Sending transaction",
                signer_id = envelope.signer_id,
                receiver_id = envelope.receiver_id,
                nonce = envelope.nonce,
            );
            let outcome = self.ledger.send_transaction(bytes).await?;
            log_debug!(
                MODULE,
                "Transaction executed",
                tx_hash = outcome.transaction_hash().unwrap_or("unknown"),
            );
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// First authorized account; lookup failures count as signed out
    async fn default_signer(&self, network: &Network) -> BridgeResult<String> {
        let accounts = self.get_accounts(network).await.unwrap_or_default();
        accounts
            .into_iter()
            .next()
            .map(|account| account.account_id)
            .ok_or_else(BridgeError::not_signed_in)
    }

    // =========================================================================
    // Unsupported
    // =========================================================================

    pub async fn verify_owner(&self, _message: &str) -> BridgeResult<SignedMessage> {
        Err(BridgeError::not_supported())
    }

    pub async fn create_signed_transaction(
        &self,
        _receiver_id: &str,
        _actions: Vec<Action>,
    ) -> BridgeResult<Vec<u8>> {
        Err(BridgeError::not_supported())
    }

    pub async fn sign_transaction(&self, _transaction: TransactionEnvelope) -> BridgeResult<Vec<u8>> {
        Err(BridgeError::not_supported())
    }

    pub async fn get_public_key(&self) -> BridgeResult<PublicKey> {
        Err(BridgeError::not_supported())
    }

    pub async fn sign_nep413_message(&self, _params: SignMessageParams) -> BridgeResult<SignedMessage> {
        Err(BridgeError::not_supported())
    }

    pub async fn sign_delegate_action(&self, _delegate_action: serde_json::Value) -> BridgeResult<Vec<u8>> {
        Err(BridgeError::not_supported())
    }

    pub async fn sign_delegate_actions(
        &self,
        _delegate_actions: Vec<serde_json::Value>,
    ) -> BridgeResult<Vec<Vec<u8>>> {
        Err(BridgeError::not_supported())
    }
}
