//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use near_wc_bridge::session::*;
use near_wc_bridge::*;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const TOPIC: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";

/// First byte of every transaction the fake wallet signs
pub const SIGNED_MARKER: u8 = b'S';

/// Expiry (unix seconds) long in the past
pub const EXPIRED_AT: u64 = 1;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn public_key(seed: u8) -> String {
    let signing = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
    format!("ed25519:{}", bs58::encode(signing.verifying_key().as_bytes()).into_string())
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig::default()
        .with_pairing_timeout(Duration::from_secs(30))
        .with_poll_interval(Duration::from_secs(1))
}

pub fn params(receiver_id: &str) -> TransactionParams {
    TransactionParams {
        receiver_id: receiver_id.to_string(),
        actions: vec![Action(json!({ "Transfer": { "deposit": "1" } }))],
    }
}

// =============================================================================
// Transport
// =============================================================================

/// How the fake wallet serializes signed bytes
#[derive(Debug, Clone, Copy)]
pub enum SignatureShape {
    Array,
    Buffer,
    Indexed,
}

impl SignatureShape {
    pub fn encode(self, bytes: &[u8]) -> Value {
        match self {
            SignatureShape::Array => json!(bytes),
            SignatureShape::Buffer => json!({ "type": "Buffer", "data": bytes }),
            SignatureShape::Indexed => Value::Object(
                bytes
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (i.to_string(), json!(b)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

#[derive(Default)]
struct TransportState {
    session: Option<SessionStruct>,
    proposed: bool,
    polls_since_connect: usize,
    get_session_calls: usize,
}

pub struct FakeTransport {
    network: Network,
    wallet_accounts: Vec<Account>,
    approve_after_polls: Option<usize>,
    fail_get_session_call: Option<usize>,
    shape: SignatureShape,
    replies: Mutex<HashMap<String, VecDeque<BridgeResult<Value>>>>,
    state: Mutex<TransportState>,
    pub proposals: Mutex<Vec<ConnectParams>>,
    pub requests: Mutex<Vec<RequestArguments>>,
    pub disconnects: Mutex<Vec<DisconnectParams>>,
    log: EventLog,
}

impl FakeTransport {
    /// Wallet exposing `accounts`, approving pairing on the first poll
    pub fn new(network: Network, accounts: &[&str]) -> Self {
        let wallet_accounts = accounts
            .iter()
            .enumerate()
            .map(|(i, id)| Account::new(*id, public_key(i as u8 + 1)))
            .collect();

        Self {
            network,
            wallet_accounts,
            approve_after_polls: Some(1),
            fail_get_session_call: None,
            shape: SignatureShape::Array,
            replies: Mutex::new(HashMap::new()),
            state: Mutex::new(TransportState::default()),
            proposals: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            disconnects: Mutex::new(Vec::new()),
            log: EventLog::default(),
        }
    }

    /// Already paired before the test starts
    pub fn paired(self) -> Self {
        let session = self.session_struct();
        self.state.lock().unwrap().session = Some(session);
        self
    }

    /// An expired session is still on the relay when the test starts
    pub fn with_expired_session(self) -> Self {
        let mut session = self.session_struct();
        session.expiry = Some(EXPIRED_AT);
        self.state.lock().unwrap().session = Some(session);
        self
    }

    /// `None` never approves
    pub fn approve_after(mut self, polls: Option<usize>) -> Self {
        self.approve_after_polls = polls;
        self
    }

    /// Fail the n-th (1-based) `get_session` call with a network error
    pub fn fail_get_session_call(mut self, call: usize) -> Self {
        self.fail_get_session_call = Some(call);
        self
    }

    pub fn with_shape(mut self, shape: SignatureShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// Answer the next `method` request with `reply` instead of the wallet
    pub fn script(&self, method: &str, reply: BridgeResult<Value>) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// The wallet drops the session on its side
    pub fn end_session(&self) {
        self.state.lock().unwrap().session = None;
    }

    pub fn has_session(&self) -> bool {
        self.state.lock().unwrap().session.is_some()
    }

    pub fn requests_for(&self, method: &str) -> Vec<RequestArguments> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.request.method == method)
            .cloned()
            .collect()
    }

    fn session_struct(&self) -> SessionStruct {
        let mut namespaces = std::collections::BTreeMap::new();
        namespaces.insert(
            "near".to_string(),
            SettleNamespace {
                accounts: self
                    .wallet_accounts
                    .iter()
                    .map(|a| format!("{}{}", self.network.account_prefix(), a.account_id))
                    .collect(),
                methods: WC_METHODS.iter().map(|m| m.to_string()).collect(),
                events: WC_EVENTS.iter().map(|e| e.to_string()).collect(),
                chains: Some(vec![self.network.chain_id()]),
            },
        );
        SessionStruct {
            topic: TOPIC.to_string(),
            namespaces,
            expiry: None,
        }
    }

    fn sign(&self, unsigned: &Value) -> Value {
        let mut signed = vec![SIGNED_MARKER];
        signed.extend(
            unsigned
                .as_array()
                .map(|items| items.iter().filter_map(|v| v.as_u64()).map(|b| b as u8).collect::<Vec<_>>())
                .unwrap_or_default(),
        );
        self.shape.encode(&signed)
    }
}

#[async_trait]
impl PairingTransport for FakeTransport {
    async fn connect(&self, params: ConnectParams) -> BridgeResult<PairingProposal> {
        self.log.lock().unwrap().push("connect".to_string());
        self.proposals.lock().unwrap().push(params);

        let mut state = self.state.lock().unwrap();
        state.proposed = true;
        state.polls_since_connect = 0;

        Ok(PairingProposal {
            uri: format!("wc:{}@2?relay-protocol=irn&symKey=00ff", TOPIC),
            topic: TOPIC.to_string(),
        })
    }

    async fn request(&self, args: RequestArguments) -> BridgeResult<Value> {
        let method = args.request.method.clone();
        self.log.lock().unwrap().push(format!("request:{}", method));
        self.requests.lock().unwrap().push(args.clone());

        if !self.has_session() || args.topic != TOPIC {
            return Err(BridgeError::no_session());
        }

        let scripted = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&method)
            .and_then(|queue| queue.pop_front());
        if let Some(reply) = scripted {
            return reply;
        }

        match method.as_str() {
            NEAR_GET_ACCOUNTS => Ok(serde_json::to_value(&self.wallet_accounts)?),
            NEAR_SIGN_OUT => Ok(Value::Null),
            NEAR_SIGN_TRANSACTION => Ok(self.sign(&args.request.params["transaction"])),
            NEAR_SIGN_TRANSACTIONS => {
                let signed: Vec<Value> = args.request.params["transactions"]
                    .as_array()
                    .map(|txs| txs.iter().map(|tx| self.sign(tx)).collect())
                    .unwrap_or_default();
                Ok(Value::Array(signed))
            }
            NEAR_SIGN_MESSAGE => Ok(json!({
                "accountId": self.wallet_accounts[0].account_id,
                "publicKey": self.wallet_accounts[0].public_key,
                "signature": "c2lnbmF0dXJl",
            })),
            _ => Err(BridgeError::not_supported()),
        }
    }

    async fn get_session(&self) -> BridgeResult<Option<SessionStruct>> {
        let mut state = self.state.lock().unwrap();
        state.get_session_calls += 1;
        if self.fail_get_session_call == Some(state.get_session_calls) {
            return Err(BridgeError::network("relay unavailable"));
        }

        let awaiting = match &state.session {
            None => true,
            Some(session) => session.expiry == Some(EXPIRED_AT),
        };
        if awaiting && state.proposed {
            state.polls_since_connect += 1;
            if let Some(after) = self.approve_after_polls {
                if state.polls_since_connect >= after {
                    state.session = Some(self.session_struct());
                    state.proposed = false;
                }
            }
        }

        Ok(state.session.clone())
    }

    async fn disconnect(&self, params: DisconnectParams) -> BridgeResult<()> {
        self.log.lock().unwrap().push("disconnect".to_string());
        self.disconnects.lock().unwrap().push(params);
        self.state.lock().unwrap().session = None;
        Ok(())
    }
}

// =============================================================================
// Modal
// =============================================================================

pub struct FakeModal {
    state: watch::Sender<ModalState>,
    dismiss_on_open: bool,
    pub opened: Mutex<Vec<OpenModalParams>>,
    closes: AtomicUsize,
}

impl FakeModal {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ModalState::default());
        Self {
            state,
            dismiss_on_open: false,
            opened: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    /// The user closes the modal right after it appears
    pub fn dismissing() -> Self {
        Self {
            dismiss_on_open: true,
            ..Self::new()
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PairingModal for FakeModal {
    async fn open_modal(&self, params: OpenModalParams) -> BridgeResult<()> {
        self.opened.lock().unwrap().push(params);
        self.state.send_replace(ModalState { open: true });
        if self.dismiss_on_open {
            self.state.send_replace(ModalState { open: false });
        }
        Ok(())
    }

    async fn close_modal(&self) -> BridgeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(ModalState { open: false });
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<ModalState> {
        self.state.subscribe()
    }
}

// =============================================================================
// Ledger
// =============================================================================

pub struct FakeLedger {
    nonce: AtomicU64,
    block_hash: CryptoHash,
    failing_blocks: AtomicUsize,
    send_delays: Mutex<VecDeque<Duration>>,
    broadcast_error: Mutex<Option<BridgeError>>,
    pub submitted: Mutex<Vec<Vec<u8>>>,
    log: EventLog,
}

impl FakeLedger {
    pub fn new(nonce: u64) -> Self {
        Self {
            nonce: AtomicU64::new(nonce),
            block_hash: CryptoHash([9u8; 32]),
            failing_blocks: AtomicUsize::new(0),
            send_delays: Mutex::new(VecDeque::new()),
            broadcast_error: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
            log: EventLog::default(),
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// The first `count` block queries fail with a network error
    pub fn failing_blocks(self, count: usize) -> Self {
        self.failing_blocks.store(count, Ordering::SeqCst);
        self
    }

    /// Per-submission latency for `send_transaction`, in call order
    pub fn send_delays(self, delays: &[Duration]) -> Self {
        self.send_delays.lock().unwrap().extend(delays.iter().copied());
        self
    }

    pub fn reject_broadcast(&self, error: BridgeError) {
        *self.broadcast_error.lock().unwrap() = Some(error);
    }

    pub fn block_hash(&self) -> CryptoHash {
        self.block_hash
    }

    fn record(&self, signed_tx: &[u8]) -> BridgeResult<FinalExecutionOutcome> {
        self.submitted.lock().unwrap().push(signed_tx.to_vec());
        if let Some(error) = self.broadcast_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(FinalExecutionOutcome(json!({
            "status": { "SuccessValue": "" },
            "transaction": { "hash": format!("hash-{}", receiver_of(signed_tx)) }
        })))
    }
}

/// Receiver id encoded by [`FakeCodec`] in signed bytes
pub fn receiver_of(signed_tx: &[u8]) -> String {
    String::from_utf8_lossy(signed_tx.get(1..).unwrap_or_default())
        .split('|')
        .nth(1)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn block(&self, _finality: Finality) -> BridgeResult<BlockView> {
        self.log.lock().unwrap().push("block".to_string());
        let failing = self.failing_blocks.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_blocks.store(failing - 1, Ordering::SeqCst);
            return Err(BridgeError::network("connection reset"));
        }

        Ok(BlockView {
            header: BlockHeaderView {
                hash: self.block_hash.to_string(),
                height: 100,
            },
        })
    }

    async fn view_access_key(
        &self,
        account_id: &str,
        _public_key: &str,
        _finality: Finality,
    ) -> BridgeResult<AccessKeyView> {
        self.log.lock().unwrap().push(format!("view_access_key:{}", account_id));
        Ok(AccessKeyView {
            nonce: self.nonce.load(Ordering::SeqCst),
            block_hash: None,
        })
    }

    async fn broadcast_tx_commit(&self, signed_tx_base64: &str) -> BridgeResult<FinalExecutionOutcome> {
        use base64::Engine;

        self.log.lock().unwrap().push("broadcast_tx_commit".to_string());
        let bytes = base64::engine::general_purpose::STANDARD.decode(signed_tx_base64)?;
        self.record(&bytes)
    }

    async fn send_transaction(&self, signed_tx: &[u8]) -> BridgeResult<FinalExecutionOutcome> {
        let receiver = receiver_of(signed_tx);
        self.log.lock().unwrap().push(format!("send_start:{}", receiver));

        let delay = self.send_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.log.lock().unwrap().push(format!("send_end:{}", receiver));
        self.record(signed_tx)
    }
}

// =============================================================================
// Codec
// =============================================================================

/// `signer|receiver|nonce|public_key` as bytes; signed bytes carry a marker
pub struct FakeCodec;

impl TransactionCodec for FakeCodec {
    fn encode_transaction(&self, tx: &TransactionEnvelope) -> Result<Vec<u8>, CodecError> {
        Ok(format!("{}|{}|{}|{}", tx.signer_id, tx.receiver_id, tx.nonce, tx.public_key).into_bytes())
    }

    fn verify_signed(&self, signed_tx: &[u8]) -> Result<(), CodecError> {
        match signed_tx.first() {
            Some(&SIGNED_MARKER) if signed_tx.len() > 1 => Ok(()),
            _ => Err(CodecError::InvalidSignedTransaction("missing signature".into())),
        }
    }
}

pub fn unsigned_bytes(signer: &str, receiver: &str, nonce: u64, key: &str) -> Vec<u8> {
    format!("{}|{}|{}|{}", signer, receiver, nonce, key).into_bytes()
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub wallet: WalletConnectWallet,
    pub transport: Arc<FakeTransport>,
    pub modal: Arc<FakeModal>,
    pub ledger: Arc<FakeLedger>,
    log: EventLog,
}

impl Harness {
    pub fn new(transport: FakeTransport, modal: FakeModal, ledger: FakeLedger) -> Self {
        let log = EventLog::default();
        let transport = Arc::new(transport.with_log(log.clone()));
        let ledger = Arc::new(ledger.with_log(log.clone()));
        let modal = Arc::new(modal);

        let wallet = WalletConnectWallet::new(
            transport.clone(),
            modal.clone(),
            ledger.clone(),
            Arc::new(FakeCodec),
            &test_config(),
        );

        Self {
            wallet,
            transport,
            modal,
            ledger,
            log,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn events_matching(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}
