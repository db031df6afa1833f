//! Manager-owned chat state and its mutation rules
//!
//! One logical owner (the manager) applies every mutation sequentially;
//! these helpers encode the list invariants: message ids are unique,
//! insertion is append-only, and the single exception is an optimistic
//! placeholder being replaced or removed in place.

use widget_core::{ChatMessage, ChatSession, ChatSessionUpdate};

/// Snapshot of everything the UI needs to render a chat.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub session: Option<ChatSession>,
    pub messages: Vec<ChatMessage>,
    pub is_connecting: bool,
    pub is_connected: bool,
    pub is_sending: bool,
    pub is_agent_typing: bool,
    pub error: Option<String>,
}

impl ChatState {
    /// Session is live for the UI (`PENDING` or `ACTIVE`).
    pub fn is_session_active(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.status.is_active())
            .unwrap_or(false)
    }

    /// Session reached a terminal state (`CLOSED` or `EXPIRED`).
    pub fn is_session_closed(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.status.is_terminal())
            .unwrap_or(false)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Append a message unless its id is already present.
    ///
    /// Guards against duplicate delivery from reconnect-triggered backlog
    /// overlap. Returns whether the message was appended.
    pub fn push_unique(&mut self, message: ChatMessage) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Swap a placeholder for its server-confirmed counterpart, keeping
    /// the list position. Returns whether the placeholder was found.
    pub fn replace_message(&mut self, placeholder_id: &str, replacement: ChatMessage) -> bool {
        match self.messages.iter_mut().find(|m| m.id == placeholder_id) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        }
    }

    /// Remove a message in place. Returns whether anything was removed.
    pub fn remove_message(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Merge a live partial update into the current session, if any.
    pub fn apply_session_update(&mut self, update: &ChatSessionUpdate) {
        if let Some(session) = &mut self.session {
            session.apply_update(update);
        }
    }

    /// Terminal override applied on a session-closed event.
    pub fn close_session(&mut self) {
        if let Some(session) = &mut self.session {
            session.force_closed();
        }
    }

    /// Reset everything session-scoped; the last error is kept for the UI.
    pub fn clear_session(&mut self) {
        self.session = None;
        self.messages.clear();
        self.is_connecting = false;
        self.is_connected = false;
        self.is_sending = false;
        self.is_agent_typing = false;
    }
}
