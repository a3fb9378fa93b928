//! Session store
//!
//! The one place the active pairing lives. Only the session manager
//! mutates it; everyone else receives cloned snapshots.

use crate::session::transport::SessionStruct;
use crate::types::{Account, Network, NEAR_NAMESPACE};
use std::sync::RwLock;

/// Account authorized by a settled session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAccount {
    /// Session-scoped id, `near:<network>:<account>`
    pub id: String,
    pub public_key: Option<String>,
}

/// Snapshot of an established pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSession {
    pub topic: String,
    pub namespace: String,
    pub chains: Vec<String>,
    pub accounts: Vec<SessionAccount>,
    pub expiry: Option<u64>,
    pub valid: bool,
}

impl PairingSession {
    pub fn from_struct(raw: SessionStruct) -> Self {
        let namespace = raw.namespaces.get(NEAR_NAMESPACE).cloned().unwrap_or_default();

        // Settled namespaces may omit `chains`; recover them from account ids
        let chains = namespace.chains.clone().unwrap_or_else(|| {
            let mut chains: Vec<String> = Vec::new();
            for id in &namespace.accounts {
                if let Some((chain, _)) = id.rsplit_once(':') {
                    if !chains.iter().any(|c| c == chain) {
                        chains.push(chain.to_string());
                    }
                }
            }
            chains
        });

        let accounts = namespace
            .accounts
            .into_iter()
            .map(|id| SessionAccount { id, public_key: None })
            .collect();

        let valid = match raw.expiry {
            Some(expiry) => expiry > chrono::Utc::now().timestamp().max(0) as u64,
            None => true,
        };

        Self {
            topic: raw.topic,
            namespace: NEAR_NAMESPACE.to_string(),
            chains,
            accounts,
            expiry: raw.expiry,
            valid,
        }
    }

    /// Accounts with the `near:<network>:` prefix stripped
    pub fn accounts_for(&self, network: &Network) -> Vec<Account> {
        let prefix = network.account_prefix();
        self.accounts
            .iter()
            .map(|account| {
                let account_id = account.id.strip_prefix(&prefix).unwrap_or(&account.id);
                Account::new(account_id, account.public_key.clone().unwrap_or_default())
            })
            .collect()
    }
}

/// Lifecycle of the pairing channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// URI issued, waiting for the wallet to approve
    Pairing { topic: String },
    Active(PairingSession),
}

#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn session(&self) -> Option<PairingSession> {
        match &*self.state.read().unwrap_or_else(|e| e.into_inner()) {
            SessionState::Active(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub fn is_pairing(&self) -> bool {
        matches!(self.state(), SessionState::Pairing { .. })
    }

    pub(crate) fn begin_pairing(&self, topic: impl Into<String>) {
        self.set(SessionState::Pairing { topic: topic.into() });
    }

    pub(crate) fn activate(&self, session: PairingSession) {
        self.set(SessionState::Active(session));
    }

    /// Back to `Disconnected`, returning the session that was active
    pub(crate) fn clear(&self) -> Option<PairingSession> {
        let previous = std::mem::take(&mut *self.state.write().unwrap_or_else(|e| e.into_inner()));
        match previous {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    fn set(&self, next: SessionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }
}
