//! Transport adapter - one live connection per (visitor, session) pair

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use widget_core::{ChatMessage, ChatSessionUpdate, SdkConfig};

use crate::connection::{ClientSignal, ConnectParams, RealtimeConnection, WireEvent};
use crate::error::{Result, TransportError};
use crate::listeners::{ListenerSet, Subscription};
use crate::states::LinkState;

/// Reason reported when the server closes a session without giving one.
const DEFAULT_CLOSE_REASON: &str = "Chat session ended";

/// Tunables the adapter needs from the SDK configuration.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub agent_typing_clear: Duration,
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            agent_typing_clear: Duration::from_secs(5),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl TransportOptions {
    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            agent_typing_clear: config.agent_typing_clear,
            reconnect_attempts: config.reconnect_attempts,
            reconnect_delay: config.reconnect_delay,
        }
    }
}

struct Shared {
    params: ConnectParams,
    options: TransportOptions,
    state: StdMutex<LinkState>,
    connection: Mutex<Box<dyn RealtimeConnection>>,
    disposed: AtomicBool,

    on_message: ListenerSet<ChatMessage>,
    on_session_update: ListenerSet<ChatSessionUpdate>,
    on_session_closed: ListenerSet<String>,
    on_agent_typing: ListenerSet<bool>,
    on_connection_change: ListenerSet<bool>,
    on_error: ListenerSet<String>,

    typing_clear: StdMutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn state(&self) -> LinkState {
        // A poisoned lock means a listener panicked; report the link dead.
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(LinkState::Disconnected)
    }

    fn set_state(&self, next: LinkState) {
        if let Ok(mut state) = self.state.lock() {
            if state.can_move_to(next) {
                debug!("transport state {:?} -> {:?}", *state, next);
                *state = next;
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    async fn send_signal(&self, signal: ClientSignal) {
        let event = signal.event_name();
        let mut connection = self.connection.lock().await;
        if let Err(e) = connection.send(signal).await {
            debug!("outbound {event} dropped: {e}");
        }
    }

    fn mark_connected(self: &Arc<Self>) {
        self.set_state(LinkState::Connected);
        self.on_connection_change.emit(&true);
    }

    /// Schedule (cancel-and-reschedule) the typing-stopped signal that the
    /// protocol never sends.
    fn schedule_typing_clear(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            time::sleep(shared.options.agent_typing_clear).await;
            if !shared.is_disposed() {
                shared.on_agent_typing.emit(&false);
            }
        });
        if let Ok(mut slot) = self.typing_clear.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    fn cancel_typing_clear(&self) {
        if let Ok(mut slot) = self.typing_clear.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

/// Wraps one real-time connection bound to a `(visitor, session)` pair,
/// translating wire events into typed callbacks and owning the reconnect
/// policy.
pub struct TransportAdapter {
    shared: Arc<Shared>,
    reader: StdMutex<Option<JoinHandle<()>>>,
}

impl TransportAdapter {
    pub fn new(
        connection: Box<dyn RealtimeConnection>,
        visitor_id: impl Into<String>,
        session_id: impl Into<String>,
        options: TransportOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                params: ConnectParams::new(visitor_id, session_id),
                options,
                state: StdMutex::new(LinkState::Idle),
                connection: Mutex::new(connection),
                disposed: AtomicBool::new(false),
                on_message: ListenerSet::new(),
                on_session_update: ListenerSet::new(),
                on_session_closed: ListenerSet::new(),
                on_agent_typing: ListenerSet::new(),
                on_connection_change: ListenerSet::new(),
                on_error: ListenerSet::new(),
                typing_clear: StdMutex::new(None),
            }),
            reader: StdMutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.params.session_id
    }

    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_live()
    }

    /// Open the connection and join the session room.
    ///
    /// Idempotent: resolves immediately while already connected or
    /// connecting. An initial-connect failure parks the adapter back in
    /// `Idle` so the caller can retry. A `Disconnected` adapter is retired;
    /// attach a fresh one instead of reconnecting it.
    pub async fn connect(&self) -> Result<()> {
        if self.shared.is_disposed() {
            return Err(TransportError::Disposed);
        }
        match self.state() {
            state if state.is_busy() => return Ok(()),
            LinkState::Disconnected => {
                return Err(TransportError::ConnectionLost(
                    "adapter already disconnected".to_string(),
                ));
            }
            _ => {}
        }

        self.shared.set_state(LinkState::Connecting);
        self.shared.on_connection_change.emit(&false);

        let receiver = {
            let mut connection = self.shared.connection.lock().await;
            match connection.open(&self.shared.params).await {
                Ok(receiver) => receiver,
                Err(e) => {
                    self.shared.set_state(LinkState::Idle);
                    self.shared.on_error.emit(&format!("connection error: {e}"));
                    return Err(e);
                }
            }
        };

        self.shared.mark_connected();
        self.shared
            .send_signal(ClientSignal::JoinSession {
                session_id: self.shared.params.session_id.clone(),
            })
            .await;

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(run_reader(shared, receiver));
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(old) = reader.replace(handle) {
                old.abort();
            }
        }
        Ok(())
    }

    /// Leave the session room and drop the connection. Safe to call
    /// repeatedly or on a never-connected adapter.
    pub async fn disconnect(&self) {
        let was_live = self.state().is_live();

        // Stop the reader first so our own close is not mistaken for an
        // unsolicited drop.
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(handle) = reader.take() {
                handle.abort();
            }
        }

        if was_live {
            self.shared
                .send_signal(ClientSignal::LeaveSession {
                    session_id: self.shared.params.session_id.clone(),
                })
                .await;
        }

        {
            let mut connection = self.shared.connection.lock().await;
            connection.close().await;
        }

        // A never-connected adapter stays Idle; set_state rejects the move.
        self.shared.set_state(LinkState::Disconnected);
        if was_live {
            self.shared.on_connection_change.emit(&false);
        }
    }

    /// Disconnect and drop every listener registration, preventing
    /// callbacks into a torn-down owner. Idempotent.
    pub async fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.cancel_typing_clear();
        self.disconnect().await;

        self.shared.on_message.clear();
        self.shared.on_session_update.clear();
        self.shared.on_session_closed.clear();
        self.shared.on_agent_typing.clear();
        self.shared.on_connection_change.clear();
        self.shared.on_error.clear();
    }

    // ==================== Outbound signals ====================

    pub async fn emit_typing(&self) {
        if self.is_connected() {
            self.shared
                .send_signal(ClientSignal::TypingStart {
                    session_id: self.shared.params.session_id.clone(),
                })
                .await;
        }
    }

    pub async fn emit_stop_typing(&self) {
        if self.is_connected() {
            self.shared
                .send_signal(ClientSignal::TypingStop {
                    session_id: self.shared.params.session_id.clone(),
                })
                .await;
        }
    }

    // ==================== Event listeners ====================

    pub fn on_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.shared.on_message.subscribe(callback)
    }

    pub fn on_session_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChatSessionUpdate) + Send + Sync + 'static,
    {
        self.shared.on_session_update.subscribe(callback)
    }

    pub fn on_session_closed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.shared.on_session_closed.subscribe(callback)
    }

    pub fn on_agent_typing<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.shared.on_agent_typing.subscribe(callback)
    }

    pub fn on_connection_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.shared.on_connection_change.subscribe(callback)
    }

    pub fn on_error<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.shared.on_error.subscribe(callback)
    }
}

/// Inbound event pump. Processes events in delivery order, one at a time.
async fn run_reader(shared: Arc<Shared>, mut receiver: mpsc::Receiver<WireEvent>) {
    loop {
        let event = match receiver.recv().await {
            Some(event) => event,
            None => {
                // Sender dropped without an explicit Down: same treatment.
                if shared.is_disposed() {
                    return;
                }
                shared.on_connection_change.emit(&false);
                match reconnect(&shared).await {
                    Some(next) => {
                        receiver = next;
                        continue;
                    }
                    None => return,
                }
            }
        };

        if shared.is_disposed() {
            return;
        }

        match event {
            WireEvent::Up => {
                // Underlying transport re-established on its own; re-join.
                shared.mark_connected();
                shared
                    .send_signal(ClientSignal::JoinSession {
                        session_id: shared.params.session_id.clone(),
                    })
                    .await;
            }
            WireEvent::Down => {
                shared.on_connection_change.emit(&false);
                match reconnect(&shared).await {
                    Some(next) => receiver = next,
                    None => return,
                }
            }
            WireEvent::Fault(message) => {
                shared.on_error.emit(&format!("transport error: {message}"));
            }
            WireEvent::Message(message) => {
                // Forwarded unconditionally; dedup is the owner's concern
                shared.on_message.emit(&message);
            }
            WireEvent::SessionUpdated(update) => {
                let targeted = update
                    .id
                    .as_deref()
                    .map_or(true, |id| id == shared.params.session_id);
                if targeted {
                    shared.on_session_update.emit(&update);
                }
            }
            WireEvent::SessionClosed { session_id, reason } => {
                if session_id == shared.params.session_id {
                    let reason =
                        reason.unwrap_or_else(|| DEFAULT_CLOSE_REASON.to_string());
                    shared.on_session_closed.emit(&reason);
                }
            }
            WireEvent::AgentTyping { session_id } => {
                if session_id == shared.params.session_id {
                    shared.on_agent_typing.emit(&true);
                    shared.schedule_typing_clear();
                }
            }
        }
    }
}

/// Capped fixed-backoff reconnect after an unsolicited drop.
async fn reconnect(shared: &Arc<Shared>) -> Option<mpsc::Receiver<WireEvent>> {
    shared.set_state(LinkState::Connecting);

    for attempt in 1..=shared.options.reconnect_attempts {
        if shared.is_disposed() {
            return None;
        }
        time::sleep(shared.options.reconnect_delay).await;

        let opened = {
            let mut connection = shared.connection.lock().await;
            connection.open(&shared.params).await
        };
        match opened {
            Ok(receiver) => {
                shared.mark_connected();
                shared
                    .send_signal(ClientSignal::JoinSession {
                        session_id: shared.params.session_id.clone(),
                    })
                    .await;
                return Some(receiver);
            }
            Err(e) => {
                debug!(
                    "reconnect attempt {attempt}/{} failed: {e}",
                    shared.options.reconnect_attempts
                );
            }
        }
    }

    warn!("reconnect attempts exhausted for session {}", shared.params.session_id);
    shared.set_state(LinkState::Disconnected);
    shared
        .on_error
        .emit(&"connection lost: reconnect attempts exhausted".to_string());
    None
}
