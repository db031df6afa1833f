//! Session lifecycle manager

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use uuid::Uuid;

use chat_transport::{ConnectionFactory, Subscription, TransportAdapter, TransportOptions};
use session_store::SessionStore;
use widget_api::{ChatGateway, StartChatRequest};
use widget_core::{ChatMessage, MessageSenderType, SdkConfig, StartChatResult};

use crate::state::ChatState;

/// Optional pre-chat details supplied by the host UI.
#[derive(Debug, Clone, Default)]
pub struct StartChatParams {
    pub visitor_name: Option<String>,
    pub visitor_email: Option<String>,
    pub initial_message: Option<String>,
}

struct ManagerInner {
    config: SdkConfig,
    store: SessionStore,
    gateway: Arc<dyn ChatGateway>,
    connections: Arc<dyn ConnectionFactory>,

    state: StdMutex<ChatState>,
    visitor_id: StdMutex<Option<String>>,
    adapter: Mutex<Option<Arc<TransportAdapter>>>,
    subscriptions: StdMutex<Vec<Subscription>>,
    typing_stop: StdMutex<Option<JoinHandle<()>>>,

    // One start_chat in flight per manager instance.
    starting: AtomicBool,
    // Bumped by end_session; async continuations from an earlier epoch
    // must not touch state.
    epoch: AtomicU64,
}

impl ManagerInner {
    fn live(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn update_state(&self, mutate: impl FnOnce(&mut ChatState)) {
        if let Ok(mut state) = self.state.lock() {
            mutate(&mut state);
        }
    }

    fn with_state<R>(&self, read: impl FnOnce(&ChatState) -> R) -> Option<R> {
        self.state.lock().ok().map(|state| read(&state))
    }

    fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update_state(|state| state.error = Some(message));
    }

    fn cancel_typing_stop(&self) {
        if let Ok(mut slot) = self.typing_stop.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

/// Owns the in-memory session and message list for their whole lifetime
/// and applies every mutation sequentially. The UI reads snapshots and
/// invokes the action methods; no error type crosses this boundary.
pub struct ChatSessionManager {
    inner: Arc<ManagerInner>,
}

impl ChatSessionManager {
    pub fn new(
        config: SdkConfig,
        store: SessionStore,
        gateway: Arc<dyn ChatGateway>,
        connections: Arc<dyn ConnectionFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                store,
                gateway,
                connections,
                state: StdMutex::new(ChatState::default()),
                visitor_id: StdMutex::new(None),
                adapter: Mutex::new(None),
                subscriptions: StdMutex::new(Vec::new()),
                typing_stop: StdMutex::new(None),
                starting: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ChatState {
        self.inner
            .with_state(|state| state.clone())
            .unwrap_or_default()
    }

    /// Establish a session: recover the visitor's existing one or create a
    /// new one, load the backlog, then attach the real-time transport.
    ///
    /// Returns `false` on failure, leaving the error in the state for the
    /// UI; the manager stays usable for a retry. Only one call may be in
    /// flight; a reentrant call returns `false` without side effects.
    pub async fn start_chat(&self, params: StartChatParams) -> bool {
        if self.inner.starting.swap(true, Ordering::SeqCst) {
            warn!("start_chat already in flight, ignoring reentrant call");
            return false;
        }
        let result = self.start_chat_inner(params).await;
        self.inner.starting.store(false, Ordering::SeqCst);
        result
    }

    async fn start_chat_inner(&self, params: StartChatParams) -> bool {
        let inner = &self.inner;
        let epoch = inner.epoch.load(Ordering::SeqCst);

        inner.update_state(|state| {
            state.is_connecting = true;
            state.error = None;
        });

        let visitor_id = inner.store.get_or_create_visitor_id().await;
        if !inner.live(epoch) {
            return false;
        }
        if let Ok(mut slot) = inner.visitor_id.lock() {
            *slot = Some(visitor_id.clone());
        }

        let result = self.obtain_session(&visitor_id, &params).await;
        let result = match result {
            Ok(result) => result,
            Err(message) => {
                inner.update_state(|state| {
                    state.error = Some(message);
                    state.is_connecting = false;
                });
                return false;
            }
        };
        if !inner.live(epoch) {
            return false;
        }

        inner
            .store
            .set_active_session_id(Some(&result.session.id))
            .await;

        // Backlog replaces the list wholesale; this is the one case where
        // the list is not appended to. A backlog fault is not fatal: live
        // events still flow into an empty list.
        let backlog = match inner.gateway.get_messages(&result.session.id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("backlog fetch failed for {}: {e}", result.session.id);
                Vec::new()
            }
        };
        if !inner.live(epoch) {
            return false;
        }

        let session_id = result.session.id.clone();
        inner.update_state(|state| {
            state.session = Some(result.session);
            state.messages = backlog;
        });

        let adapter = Arc::new(TransportAdapter::new(
            inner.connections.create(),
            visitor_id,
            session_id,
            TransportOptions::from_config(&inner.config),
        ));
        self.wire_adapter(&adapter, epoch);

        if let Err(e) = adapter.connect().await {
            adapter.dispose().await;
            if let Ok(mut subscriptions) = inner.subscriptions.lock() {
                subscriptions.clear();
            }
            inner.update_state(|state| {
                state.error = Some(format!("{e}"));
                state.is_connecting = false;
            });
            return false;
        }
        if !inner.live(epoch) {
            adapter.dispose().await;
            return false;
        }
        *inner.adapter.lock().await = Some(adapter);

        inner.update_state(|state| state.is_connecting = false);
        true
    }

    /// Recovery-or-creation. A recovery fault is logged and treated as
    /// "nothing to recover" so a backend blip never blocks a fresh chat,
    /// but it is distinguishable in the logs from a plain "no session".
    async fn obtain_session(
        &self,
        visitor_id: &str,
        params: &StartChatParams,
    ) -> Result<StartChatResult, String> {
        match self.inner.gateway.recover_session(visitor_id).await {
            Ok(Some(result)) => {
                debug!("recovered session {}", result.session.id);
                return Ok(result);
            }
            Ok(None) => debug!("no active session for visitor"),
            Err(e) => warn!("recovery lookup failed, starting fresh: {e}"),
        }

        self.inner
            .gateway
            .start_chat(StartChatRequest {
                visitor_id: visitor_id.to_string(),
                visitor_name: params.visitor_name.clone(),
                visitor_email: params.visitor_email.clone(),
                initial_message: params.initial_message.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| e.to_string())
    }

    fn wire_adapter(&self, adapter: &TransportAdapter, epoch: u64) {
        let weak = Arc::downgrade(&self.inner);

        let on_state =
            move |mutate: Box<dyn FnOnce(&mut ChatState)>| {
                if let Some(inner) = weak.upgrade() {
                    if inner.live(epoch) {
                        inner.update_state(mutate);
                    }
                }
            };

        let subscriptions = vec![
            adapter.on_message({
                let on_state = on_state.clone();
                move |message| {
                    let message = message.clone();
                    on_state(Box::new(move |state| {
                        state.push_unique(message);
                    }));
                }
            }),
            adapter.on_session_update({
                let on_state = on_state.clone();
                move |update| {
                    let update = update.clone();
                    on_state(Box::new(move |state| state.apply_session_update(&update)));
                }
            }),
            adapter.on_session_closed({
                let on_state = on_state.clone();
                move |_reason| {
                    on_state(Box::new(|state| state.close_session()));
                }
            }),
            adapter.on_agent_typing({
                let on_state = on_state.clone();
                move |typing| {
                    let typing = *typing;
                    on_state(Box::new(move |state| state.is_agent_typing = typing));
                }
            }),
            adapter.on_connection_change({
                let on_state = on_state.clone();
                move |connected| {
                    let connected = *connected;
                    on_state(Box::new(move |state| state.is_connected = connected));
                }
            }),
            adapter.on_error({
                let on_state = on_state.clone();
                move |error| {
                    let error = error.clone();
                    on_state(Box::new(move |state| state.error = Some(error)));
                }
            }),
        ];

        if let Ok(mut slot) = self.inner.subscriptions.lock() {
            *slot = subscriptions;
        }
    }

    /// Optimistic send: the placeholder lands in the list before the
    /// request leaves, is replaced in place on success, and is removed on
    /// failure. Either way typing is considered ended.
    pub async fn send_message(&self, content: &str) -> bool {
        let inner = &self.inner;
        let epoch = inner.epoch.load(Ordering::SeqCst);

        let session = inner
            .with_state(|state| {
                state
                    .session
                    .as_ref()
                    .map(|s| (s.id.clone(), s.visitor_name.clone()))
            })
            .flatten();
        let Some((session_id, visitor_name)) = session else {
            return false;
        };
        let visitor_id = inner.visitor_id.lock().ok().and_then(|slot| slot.clone());
        let Some(visitor_id) = visitor_id else {
            return false;
        };

        let placeholder_id = format!("temp_{}", Uuid::new_v4().simple());
        let placeholder = ChatMessage {
            id: placeholder_id.clone(),
            session_id: session_id.clone(),
            sender_type: MessageSenderType::Visitor,
            sender_id: visitor_id.clone(),
            sender_name: visitor_name.clone(),
            content: content.to_string(),
            kind: None,
            attachments: Vec::new(),
            is_read: None,
            created_at: Utc::now(),
        };
        inner.update_state(|state| {
            state.is_sending = true;
            state.error = None;
            state.messages.push(placeholder);
        });

        let sent = inner
            .gateway
            .send_message(&session_id, content, &visitor_id, visitor_name.as_deref())
            .await;

        let ok = if inner.live(epoch) {
            match sent {
                Ok(message) => {
                    inner.update_state(|state| {
                        state.replace_message(&placeholder_id, message);
                        state.is_sending = false;
                    });
                    true
                }
                Err(e) => {
                    inner.update_state(|state| {
                        state.remove_message(&placeholder_id);
                        state.error = Some(e.to_string());
                        state.is_sending = false;
                    });
                    false
                }
            }
        } else {
            false
        };

        // A sent message implies typing has ended, success or not
        self.signal_stop_typing().await;
        ok
    }

    /// Fire-and-forget rating. Never throws past this boundary.
    pub async fn rate_chat(&self, rating: u8, feedback: Option<&str>) -> bool {
        let session_id = self
            .inner
            .with_state(|state| state.session.as_ref().map(|s| s.id.clone()))
            .flatten();
        let Some(session_id) = session_id else {
            return false;
        };

        match self
            .inner
            .gateway
            .rate_session(&session_id, rating, feedback)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("rating submission failed: {e}");
                false
            }
        }
    }

    /// Signal typing-start now; typing-stop follows after the configured
    /// inactivity window. Every call resets the window (debounce).
    pub async fn on_typing(&self) {
        let adapter = self.inner.adapter.lock().await.clone();
        let Some(adapter) = adapter else {
            return;
        };
        adapter.emit_typing().await;

        let window = self.inner.config.typing_debounce;
        let handle = tokio::spawn({
            let adapter = Arc::clone(&adapter);
            async move {
                time::sleep(window).await;
                adapter.emit_stop_typing().await;
            }
        });
        if let Ok(mut slot) = self.inner.typing_stop.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    async fn signal_stop_typing(&self) {
        self.inner.cancel_typing_stop();
        if let Some(adapter) = self.inner.adapter.lock().await.clone() {
            adapter.emit_stop_typing().await;
        }
    }

    /// Tear down the local session: dispose the transport, clear state and
    /// the persisted pointer. Idempotent; the server-side session is
    /// untouched.
    pub async fn end_session(&self) {
        let inner = &self.inner;
        inner.epoch.fetch_add(1, Ordering::SeqCst);
        inner.cancel_typing_stop();

        if let Ok(mut subscriptions) = inner.subscriptions.lock() {
            for subscription in subscriptions.drain(..) {
                subscription.unsubscribe();
            }
        }
        if let Some(adapter) = inner.adapter.lock().await.take() {
            adapter.dispose().await;
        }

        inner.update_state(|state| state.clear_session());
        inner.store.set_active_session_id(None).await;
    }
}
