//! Pairing modal boundary
//!
//! The modal shows the pairing URI as a QR code / deep link. Closing it
//! before the wallet approves is how the user cancels pairing.

use crate::error::BridgeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenModalParams {
    pub uri: String,
    pub standalone_chains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModalState {
    pub open: bool,
}

#[async_trait]
pub trait PairingModal: Send + Sync {
    async fn open_modal(&self, params: OpenModalParams) -> BridgeResult<()>;

    async fn close_modal(&self) -> BridgeResult<()>;

    /// Visibility updates; a transition to `open: false` cancels pairing
    fn subscribe(&self) -> watch::Receiver<ModalState>;
}
