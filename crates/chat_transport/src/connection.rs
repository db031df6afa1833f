//! Connection seam - the externally-provided real-time transport
//!
//! The SDK does not implement a wire protocol; the host supplies a
//! `RealtimeConnection` and the adapter drives it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use widget_core::constants::socket_events;
use widget_core::{ChatMessage, ChatSessionUpdate};

use crate::error::Result;

/// Handshake parameters sent when opening a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Always `"visitor"` for SDK connections.
    pub user_type: &'static str,
    pub visitor_id: String,
    pub session_id: String,
}

impl ConnectParams {
    pub fn new(visitor_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_type: "visitor",
            visitor_id: visitor_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// Client-to-server signals, each scoped to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSignal {
    /// `session:join` - routes subsequent events to this connection.
    JoinSession { session_id: String },
    /// `session:leave` - sent immediately before disconnecting.
    LeaveSession { session_id: String },
    /// `visitor:typing`
    TypingStart { session_id: String },
    /// `visitor:stop-typing`
    TypingStop { session_id: String },
}

impl ClientSignal {
    /// Wire event name a connection implementation emits this signal under.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinSession { .. } => socket_events::JOIN_SESSION,
            Self::LeaveSession { .. } => socket_events::LEAVE_SESSION,
            Self::TypingStart { .. } => socket_events::VISITOR_TYPING,
            Self::TypingStop { .. } => socket_events::VISITOR_STOP_TYPING,
        }
    }
}

/// Server-to-client events plus connection-level notifications.
#[derive(Debug, Clone)]
pub enum WireEvent {
    /// Transport (re)established by the underlying connection.
    Up,
    /// Transport dropped; the adapter decides whether to reconnect.
    Down,
    /// Protocol-level error.
    Fault(String),
    /// `message:new`
    Message(ChatMessage),
    /// `session:updated` - partial session, possibly broadcast (no id).
    SessionUpdated(ChatSessionUpdate),
    /// `session:closed`
    SessionClosed {
        session_id: String,
        reason: Option<String>,
    },
    /// `agent:typing` - no matching stop event exists in the protocol.
    AgentTyping { session_id: String },
}

impl WireEvent {
    /// Wire event name, `None` for connection-level notifications that
    /// carry no protocol event.
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            Self::Message(_) => Some(socket_events::NEW_MESSAGE),
            Self::SessionUpdated(_) => Some(socket_events::SESSION_UPDATED),
            Self::SessionClosed { .. } => Some(socket_events::SESSION_CLOSED),
            Self::AgentTyping { .. } => Some(socket_events::AGENT_TYPING),
            Self::Up | Self::Down | Self::Fault(_) => None,
        }
    }
}

/// One live connection to the chat server.
///
/// `open` hands back the inbound event stream; dropping the receiver or
/// calling `close` ends it.
#[async_trait]
pub trait RealtimeConnection: Send + Sync {
    async fn open(&mut self, params: &ConnectParams) -> Result<mpsc::Receiver<WireEvent>>;

    async fn send(&mut self, signal: ClientSignal) -> Result<()>;

    async fn close(&mut self);
}

/// Mints a fresh connection per session attach.
pub trait ConnectionFactory: Send + Sync {
    fn create(&self) -> Box<dyn RealtimeConnection>;
}
