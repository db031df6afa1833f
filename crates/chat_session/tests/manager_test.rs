//! Integration tests for the session lifecycle manager
//!
//! Drives the manager against a scripted gateway and a channel-backed fake
//! connection, covering establishment, live-event fusion, optimistic
//! sending, typing debounce, and teardown.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time;

use chat_session::{ChatSessionManager, StartChatParams};
use chat_transport::{
    ClientSignal, ConnectParams, ConnectionFactory, RealtimeConnection, TransportError, WireEvent,
};
use session_store::{MemoryKeyValueStore, SessionStore};
use widget_api::{ApiError, ChatGateway, StartChatRequest};
use widget_core::{
    ChatMessage, ChatSession, ChatSessionStatus, ChatSessionUpdate, MessageSenderType, SdkConfig,
    StartChatResult,
};

// ==================== Fixtures ====================

fn session(id: &str, status: ChatSessionStatus) -> ChatSession {
    ChatSession {
        id: id.to_string(),
        project_id: "proj_1".to_string(),
        visitor_id: "visitor_abc123".to_string(),
        room_id: format!("room_{id}"),
        status,
        organization_id: None,
        visitor_name: None,
        visitor_email: None,
        assigned_agent_id: None,
        assigned_agent_name: None,
        subject: None,
        tags: Vec::new(),
        message_count: None,
        last_message_at: None,
        created_at: None,
    }
}

fn start_result(id: &str, status: ChatSessionStatus) -> StartChatResult {
    let session = session(id, status);
    let room_id = session.room_id.clone();
    StartChatResult { session, room_id }
}

fn agent_message(id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        session_id: "sess_1".to_string(),
        sender_type: MessageSenderType::Agent,
        sender_id: "agent_1".to_string(),
        sender_name: Some("Dana".to_string()),
        content: content.to_string(),
        kind: None,
        attachments: Vec::new(),
        is_read: None,
        created_at: Utc::now(),
    }
}

fn server_error(message: &str) -> ApiError {
    ApiError::Server {
        status: 500,
        message: message.to_string(),
    }
}

// ==================== Scripted gateway ====================

enum RecoverScript {
    Nothing,
    Found(Box<StartChatResult>),
    Fault,
}

struct FakeGateway {
    recover: StdMutex<RecoverScript>,
    start: StdMutex<Result<StartChatResult, String>>,
    backlog: StdMutex<Vec<ChatMessage>>,
    send_fails: AtomicBool,
    rate_fails: AtomicBool,

    recover_delay: StdMutex<Duration>,
    send_delay: StdMutex<Duration>,

    recover_calls: AtomicUsize,
    start_calls: AtomicUsize,
    send_calls: AtomicUsize,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            recover: StdMutex::new(RecoverScript::Nothing),
            start: StdMutex::new(Ok(start_result("sess_1", ChatSessionStatus::Pending))),
            backlog: StdMutex::new(Vec::new()),
            send_fails: AtomicBool::new(false),
            rate_fails: AtomicBool::new(false),
            recover_delay: StdMutex::new(Duration::ZERO),
            send_delay: StdMutex::new(Duration::ZERO),
            recover_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn recover_session(
        &self,
        _visitor_id: &str,
    ) -> widget_api::Result<Option<StartChatResult>> {
        self.recover_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.recover_delay.lock().unwrap();
        if delay > Duration::ZERO {
            time::sleep(delay).await;
        }
        match &*self.recover.lock().unwrap() {
            RecoverScript::Nothing => Ok(None),
            RecoverScript::Found(result) => Ok(Some((**result).clone())),
            RecoverScript::Fault => Err(server_error("recovery outage")),
        }
    }

    async fn start_chat(&self, _request: StartChatRequest) -> widget_api::Result<StartChatResult> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| server_error(&message))
    }

    async fn get_messages(&self, _session_id: &str) -> widget_api::Result<Vec<ChatMessage>> {
        Ok(self.backlog.lock().unwrap().clone())
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        visitor_id: &str,
        _visitor_name: Option<&str>,
    ) -> widget_api::Result<ChatMessage> {
        let call = self.send_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.send_delay.lock().unwrap();
        if delay > Duration::ZERO {
            time::sleep(delay).await;
        }
        if self.send_fails.load(Ordering::SeqCst) {
            return Err(server_error("message rejected"));
        }
        Ok(ChatMessage {
            id: format!("msg_srv_{call}"),
            session_id: session_id.to_string(),
            sender_type: MessageSenderType::Visitor,
            sender_id: visitor_id.to_string(),
            sender_name: None,
            content: content.to_string(),
            kind: None,
            attachments: Vec::new(),
            is_read: None,
            created_at: Utc::now(),
        })
    }

    async fn rate_session(
        &self,
        _session_id: &str,
        _rating: u8,
        _feedback: Option<&str>,
    ) -> widget_api::Result<()> {
        if self.rate_fails.load(Ordering::SeqCst) {
            return Err(server_error("rating rejected"));
        }
        Ok(())
    }
}

// ==================== Fake transport ====================

#[derive(Clone, Default)]
struct FakeNet {
    outbound: Arc<StdMutex<Vec<ClientSignal>>>,
    event_tx: Arc<StdMutex<Option<mpsc::Sender<WireEvent>>>>,
    opens: Arc<AtomicUsize>,
    refuse_opens: Arc<AtomicBool>,
}

impl FakeNet {
    fn sent(&self) -> Vec<ClientSignal> {
        self.outbound.lock().unwrap().clone()
    }

    async fn push(&self, event: WireEvent) {
        let tx = self.event_tx.lock().unwrap().clone();
        tx.expect("transport not open").send(event).await.unwrap();
    }

    fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

struct FakeConnection {
    net: FakeNet,
}

#[async_trait]
impl RealtimeConnection for FakeConnection {
    async fn open(
        &mut self,
        _params: &ConnectParams,
    ) -> Result<mpsc::Receiver<WireEvent>, TransportError> {
        self.net.opens.fetch_add(1, Ordering::SeqCst);
        if self.net.refuse_opens.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("refused".to_string()));
        }
        let (tx, rx) = mpsc::channel(16);
        *self.net.event_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn send(&mut self, signal: ClientSignal) -> Result<(), TransportError> {
        self.net.outbound.lock().unwrap().push(signal);
        Ok(())
    }

    async fn close(&mut self) {
        *self.net.event_tx.lock().unwrap() = None;
    }
}

impl ConnectionFactory for FakeNet {
    fn create(&self) -> Box<dyn RealtimeConnection> {
        Box::new(FakeConnection { net: self.clone() })
    }
}

// ==================== Harness ====================

fn manager_with(gateway: Arc<FakeGateway>, net: FakeNet) -> ChatSessionManager {
    let config = SdkConfig::new("https://api.test", "wgt_1");
    let store = SessionStore::new(MemoryKeyValueStore::shared());
    ChatSessionManager::new(config, store, gateway, Arc::new(net))
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ==================== Establishment ====================

#[tokio::test]
async fn test_recovery_miss_falls_back_to_create_exactly_once() {
    let gateway = Arc::new(FakeGateway::default());
    let manager = manager_with(gateway.clone(), FakeNet::default());

    assert!(manager.start_chat(StartChatParams::default()).await);

    assert_eq!(gateway.recover_calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recovery_hit_skips_create() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.recover.lock().unwrap() =
        RecoverScript::Found(Box::new(start_result("sess_9", ChatSessionStatus::Active)));
    let manager = manager_with(gateway.clone(), FakeNet::default());

    assert!(manager.start_chat(StartChatParams::default()).await);

    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        manager.state().session.map(|s| s.id),
        Some("sess_9".to_string())
    );
}

#[tokio::test]
async fn test_recovery_outage_still_creates_fresh_session() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.recover.lock().unwrap() = RecoverScript::Fault;
    let manager = manager_with(gateway.clone(), FakeNet::default());

    assert!(manager.start_chat(StartChatParams::default()).await);
    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_failure_sets_error_and_skips_transport() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.start.lock().unwrap() = Err("widget is disabled".to_string());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());

    assert!(!manager.start_chat(StartChatParams::default()).await);

    let state = manager.state();
    assert!(!state.has_session());
    assert!(!state.is_connecting);
    assert_eq!(state.error.as_deref(), Some("widget is disabled"));
    assert_eq!(net.open_count(), 0);
}

#[tokio::test]
async fn test_backlog_replaces_message_list_wholesale() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.backlog.lock().unwrap() = vec![
        agent_message("msg_1", "earlier"),
        agent_message("msg_2", "history"),
    ];
    let manager = manager_with(gateway, FakeNet::default());

    assert!(manager.start_chat(StartChatParams::default()).await);

    let state = manager.state();
    let ids: Vec<String> = state.messages.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec!["msg_1", "msg_2"]);
}

#[tokio::test]
async fn test_connect_failure_is_surfaced_but_retryable() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    net.refuse_opens.store(true, Ordering::SeqCst);
    let manager = manager_with(gateway, net.clone());

    assert!(!manager.start_chat(StartChatParams::default()).await);
    assert!(manager.state().error.is_some());

    net.refuse_opens.store(false, Ordering::SeqCst);
    assert!(manager.start_chat(StartChatParams::default()).await);
    assert!(manager.state().is_connected);
}

#[tokio::test(start_paused = true)]
async fn test_reentrant_start_chat_is_rejected() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.recover_delay.lock().unwrap() = Duration::from_secs(1);
    let manager = Arc::new(manager_with(gateway.clone(), FakeNet::default()));

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.start_chat(StartChatParams::default()).await })
    };
    settle().await;

    // The first call is parked inside the recovery lookup
    assert!(!manager.start_chat(StartChatParams::default()).await);

    time::sleep(Duration::from_secs(2)).await;
    assert!(first.await.unwrap());
    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 1);
}

// ==================== Live event fusion ====================

#[tokio::test]
async fn test_pending_session_goes_active_on_live_update() {
    // First-visit flow: recover misses, create returns PENDING, the live
    // channel flips it ACTIVE.
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());

    assert!(manager.start_chat(StartChatParams::default()).await);
    let state = manager.state();
    assert_eq!(
        state.session.as_ref().map(|s| s.status),
        Some(ChatSessionStatus::Pending)
    );
    assert!(state.messages.is_empty());
    assert!(state.is_connected);

    net.push(WireEvent::SessionUpdated(ChatSessionUpdate {
        id: Some("sess_1".to_string()),
        status: Some(ChatSessionStatus::Active),
        ..Default::default()
    }))
    .await;
    settle().await;

    let state = manager.state();
    assert!(state.is_session_active());
    assert_eq!(
        state.session.map(|s| s.status),
        Some(ChatSessionStatus::Active)
    );
}

#[tokio::test]
async fn test_inbound_duplicates_are_dropped() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    net.push(WireEvent::Message(agent_message("msg_1", "hello"))).await;
    net.push(WireEvent::Message(agent_message("msg_2", "there"))).await;
    net.push(WireEvent::Message(agent_message("msg_1", "hello again"))).await;
    settle().await;

    let state = manager.state();
    let ids: Vec<String> = state.messages.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec!["msg_1", "msg_2"]);
    assert_eq!(state.messages[0].content, "hello");
}

#[tokio::test]
async fn test_session_closed_overrides_later_active_update() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    net.push(WireEvent::SessionClosed {
        session_id: "sess_1".to_string(),
        reason: None,
    })
    .await;
    settle().await;
    assert!(manager.state().is_session_closed());

    net.push(WireEvent::SessionUpdated(ChatSessionUpdate {
        id: Some("sess_1".to_string()),
        status: Some(ChatSessionStatus::Active),
        ..Default::default()
    }))
    .await;
    settle().await;

    let state = manager.state();
    assert!(state.is_session_closed());
    assert!(!state.is_session_active());
}

#[tokio::test]
async fn test_transport_fault_keeps_established_session() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    net.push(WireEvent::Fault("subscription rejected".to_string())).await;
    settle().await;

    let state = manager.state();
    assert!(state.has_session());
    assert!(state.error.as_deref().unwrap_or("").contains("subscription rejected"));
}

#[tokio::test]
async fn test_agent_typing_flag_follows_events() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    net.push(WireEvent::AgentTyping {
        session_id: "sess_1".to_string(),
    })
    .await;
    settle().await;
    assert!(manager.state().is_agent_typing);
}

// ==================== Optimistic sending ====================

#[tokio::test]
async fn test_send_replaces_placeholder_in_place() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.backlog.lock().unwrap() = vec![agent_message("msg_1", "hi there")];
    let manager = manager_with(gateway, FakeNet::default());
    assert!(manager.start_chat(StartChatParams::default()).await);

    assert!(manager.send_message("hi").await);

    let state = manager.state();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].id, "msg_srv_0");
    assert_eq!(state.messages[1].content, "hi");
    assert!(!state.is_sending);
    assert!(!state.messages.iter().any(|m| m.id.starts_with("temp_")));
}

#[tokio::test]
async fn test_send_failure_rolls_back_placeholder() {
    let gateway = Arc::new(FakeGateway::default());
    gateway.send_fails.store(true, Ordering::SeqCst);
    let manager = manager_with(gateway, FakeNet::default());
    assert!(manager.start_chat(StartChatParams::default()).await);
    let before = manager.state().messages.len();

    assert!(!manager.send_message("hi").await);

    let state = manager.state();
    assert_eq!(state.messages.len(), before);
    assert_eq!(state.error.as_deref(), Some("message rejected"));
    assert!(!state.is_sending);
}

#[tokio::test]
async fn test_send_without_session_is_a_noop_failure() {
    let gateway = Arc::new(FakeGateway::default());
    let manager = manager_with(gateway.clone(), FakeNet::default());

    assert!(!manager.send_message("hi").await);
    assert_eq!(gateway.send_calls.load(Ordering::SeqCst), 0);
    assert!(manager.state().messages.is_empty());
}

#[tokio::test]
async fn test_send_signals_stop_typing_either_way() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway.clone(), net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    manager.send_message("hi").await;
    gateway.send_fails.store(true, Ordering::SeqCst);
    manager.send_message("ho").await;

    let stops = net
        .sent()
        .iter()
        .filter(|s| matches!(s, ClientSignal::TypingStop { .. }))
        .count();
    assert_eq!(stops, 2);
}

// ==================== Typing debounce ====================

#[tokio::test(start_paused = true)]
async fn test_typing_debounce_emits_single_stop_after_last_call() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    for _ in 0..3 {
        manager.on_typing().await;
        time::sleep(Duration::from_secs(1)).await;
    }
    // Two seconds short of the window measured from the last call
    assert_eq!(
        net.sent()
            .iter()
            .filter(|s| matches!(s, ClientSignal::TypingStop { .. }))
            .count(),
        0
    );

    time::sleep(Duration::from_secs(3)).await;
    settle().await;

    let sent = net.sent();
    let starts = sent
        .iter()
        .filter(|s| matches!(s, ClientSignal::TypingStart { .. }))
        .count();
    let stops = sent
        .iter()
        .filter(|s| matches!(s, ClientSignal::TypingStop { .. }))
        .count();
    assert_eq!(starts, 3);
    assert_eq!(stops, 1);
}

// ==================== Rating ====================

#[tokio::test]
async fn test_rate_chat_returns_bool_and_never_sets_error() {
    let gateway = Arc::new(FakeGateway::default());
    let manager = manager_with(gateway.clone(), FakeNet::default());
    assert!(manager.start_chat(StartChatParams::default()).await);

    assert!(manager.rate_chat(5, Some("great")).await);

    gateway.rate_fails.store(true, Ordering::SeqCst);
    assert!(!manager.rate_chat(1, None).await);
    assert!(manager.state().error.is_none());
}

#[tokio::test]
async fn test_rate_chat_without_session_is_false() {
    let gateway = Arc::new(FakeGateway::default());
    let manager = manager_with(gateway, FakeNet::default());
    assert!(!manager.rate_chat(5, None).await);
}

// ==================== Teardown ====================

#[tokio::test]
async fn test_end_session_clears_state_and_leaves_room() {
    let gateway = Arc::new(FakeGateway::default());
    let net = FakeNet::default();
    let manager = manager_with(gateway, net.clone());
    assert!(manager.start_chat(StartChatParams::default()).await);

    manager.end_session().await;

    let state = manager.state();
    assert!(!state.has_session());
    assert!(state.messages.is_empty());
    assert!(!state.is_connected);
    assert!(net
        .sent()
        .iter()
        .any(|s| matches!(s, ClientSignal::LeaveSession { .. })));
}

#[tokio::test]
async fn test_end_session_is_idempotent() {
    let gateway = Arc::new(FakeGateway::default());
    let manager = manager_with(gateway, FakeNet::default());
    assert!(manager.start_chat(StartChatParams::default()).await);

    manager.end_session().await;
    let first = manager.state();
    manager.end_session().await;
    let second = manager.state();

    assert_eq!(first.has_session(), second.has_session());
    assert_eq!(first.messages.len(), second.messages.len());
    assert_eq!(first.is_connected, second.is_connected);
    assert_eq!(first.is_connecting, second.is_connecting);
}

#[tokio::test(start_paused = true)]
async fn test_late_send_result_after_teardown_is_discarded() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.send_delay.lock().unwrap() = Duration::from_secs(2);
    let net = FakeNet::default();
    let manager = Arc::new(manager_with(gateway, net.clone()));
    assert!(manager.start_chat(StartChatParams::default()).await);

    let send = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.send_message("hi").await })
    };
    settle().await;
    manager.end_session().await;

    time::sleep(Duration::from_secs(3)).await;
    assert!(!send.await.unwrap());

    // The confirmed message must not resurrect into the cleared list
    assert!(manager.state().messages.is_empty());
}
