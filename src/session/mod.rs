//! Session Management
//!
//! Pairing lifecycle over a WalletConnect transport:
//!
//! ```text
//! Disconnected -> Pairing (URI issued) -> Active -> Disconnected
//!                    |                                  ^
//!                    +-- modal closed / timeout --------+
//! ```
//!
//! A wallet-initiated disconnect is noticed on the next `get_session` or
//! `request`, which resets the store to `Disconnected`.

pub mod modal;
pub mod store;
pub mod transport;

pub use modal::*;
pub use store::*;
pub use transport::*;

use crate::error::{BridgeError, BridgeResult};
use crate::types::Network;
use crate::utils::config::BridgeConfig;
use crate::{log_debug, log_info, log_warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const MODULE: &str = "session";

/// Owns the pairing channel and the [`SessionStore`]
pub struct SessionManager {
    transport: Arc<dyn PairingTransport>,
    modal: Arc<dyn PairingModal>,
    store: Arc<SessionStore>,
    poll_interval: Duration,
    pairing_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn PairingTransport>,
        modal: Arc<dyn PairingModal>,
        store: Arc<SessionStore>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            transport,
            modal,
            store,
            poll_interval: config.poll_interval,
            pairing_timeout: config.pairing_timeout,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    /// Pair with a wallet for `network`, waiting until the wallet approves
    pub async fn connect(&self, network: &Network) -> BridgeResult<PairingSession> {
        self.connect_with_cancel(network, &CancellationToken::new()).await
    }

    /// Like [`connect`](Self::connect), also ending with `UserCancelled`
    /// when `cancel` fires.
    pub async fn connect_with_cancel(
        &self,
        network: &Network,
        cancel: &CancellationToken,
    ) -> BridgeResult<PairingSession> {
        let proposal = self.transport.connect(ConnectParams::near(network)).await?;
        log_info!(MODULE, "Pairing proposed", network = network, topic = proposal.topic);
        self.store.begin_pairing(proposal.topic.clone());

        // Subscribe before opening so only transitions after this point count
        let mut modal_rx = self.modal.subscribe();
        modal_rx.borrow_and_update();

        let opened = self
            .modal
            .open_modal(OpenModalParams {
                uri: proposal.uri,
                standalone_chains: vec![network.chain_id()],
            })
            .await;
        if let Err(e) = opened {
            self.store.clear();
            return Err(e);
        }

        let waited = tokio::time::timeout(
            self.pairing_timeout,
            self.wait_for_approval(&mut modal_rx, cancel),
        )
        .await
        .unwrap_or_else(|_| {
            Err(BridgeError::timeout("Pairing timed out").with_details(format!(
                "no approval within {}s",
                self.pairing_timeout.as_secs()
            )))
        });

        match waited {
            Ok(session) => {
                self.store.activate(session.clone());
                self.close_modal_quietly().await;
                log_info!(
                    MODULE,
                    "Session established",
                    topic = session.topic,
                    accounts = session.accounts.len(),
                );
                Ok(session)
            }
            Err(e) => {
                self.store.clear();
                self.close_modal_quietly().await;
                log_warn!(MODULE, "Pairing failed", error = e);
                Err(e)
            }
        }
    }

    async fn wait_for_approval(
        &self,
        modal_rx: &mut watch::Receiver<ModalState>,
        cancel: &CancellationToken,
    ) -> BridgeResult<PairingSession> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return Err(BridgeError::user_cancelled("User cancelled pairing"));
                }

                changed = modal_rx.changed() => {
                    // A dropped modal can no longer show the URI
                    if changed.is_err() || !modal_rx.borrow_and_update().open {
                        return Err(BridgeError::user_cancelled("User cancelled pairing"));
                    }
                }

                _ = ticker.tick() => {
                    match self.transport.get_session().await {
                        Ok(Some(raw)) => {
                            // A stale session left on the relay is not an approval
                            let session = PairingSession::from_struct(raw);
                            if session.valid {
                                return Ok(session);
                            }
                            log_debug!(MODULE, "Ignoring expired session", topic = session.topic);
                        }
                        Ok(None) => {}
                        Err(e) => log_debug!(MODULE, "Session poll failed", error = e),
                    }
                }
            }
        }
    }

    async fn close_modal_quietly(&self) {
        if let Err(e) = self.modal.close_modal().await {
            log_debug!(MODULE, "Closing modal failed", error = e);
        }
    }

    /// Current session, if one is established and unexpired
    pub async fn get_session(&self) -> BridgeResult<Option<PairingSession>> {
        let raw = self.transport.get_session().await?;

        match raw.map(PairingSession::from_struct) {
            Some(session) if session.valid => {
                if self.store.session().as_ref() != Some(&session) && !self.store.is_pairing() {
                    self.store.activate(session.clone());
                }
                Ok(Some(session))
            }
            Some(session) => {
                log_warn!(MODULE, "Session expired", topic = session.topic);
                self.store.clear();
                Ok(None)
            }
            None => {
                if let Some(previous) = self.store.session() {
                    log_info!(MODULE, "Session ended by wallet", topic = previous.topic);
                    self.store.clear();
                }
                Ok(None)
            }
        }
    }

    /// Close the session with a user-disconnect reason; no-op without one
    pub async fn disconnect(&self) -> BridgeResult<()> {
        // Expired sessions are torn down too
        let Some(raw) = self.transport.get_session().await? else {
            self.store.clear();
            return Ok(());
        };

        let result = self
            .transport
            .disconnect(DisconnectParams {
                topic: raw.topic.clone(),
                reason: DisconnectReason::user_disconnected(),
            })
            .await;
        self.store.clear();
        log_info!(MODULE, "Session disconnected", topic = raw.topic);
        result
    }

    /// Send `method` over the active session
    pub async fn request(&self, method: &str, params: Value, network: &Network) -> BridgeResult<Value> {
        let session = self.get_session().await?.ok_or_else(BridgeError::no_session)?;

        log_debug!(MODULE, "Sending request", method = method, topic = session.topic);
        self.transport
            .request(RequestArguments {
                topic: session.topic,
                chain_id: network.chain_id(),
                request: RpcRequest {
                    method: method.to_string(),
                    params,
                },
            })
            .await
    }
}
