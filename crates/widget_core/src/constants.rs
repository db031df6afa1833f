//! Wire constants - REST endpoints, socket event names, storage keys

/// REST endpoint path builders. All chat endpoints live under the widget
/// namespace and use the widget's public id as identifier.
pub mod endpoints {
    pub const BASE_PATH: &str = "/api/v1";

    pub fn widget_config(widget_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/config")
    }

    pub fn submit_feedback(widget_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/feedback")
    }

    pub fn check_availability(widget_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/chat/availability")
    }

    pub fn active_session(widget_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/chat/sessions/active")
    }

    pub fn start_chat(widget_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/chat/sessions")
    }

    pub fn session_messages(widget_id: &str, session_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/chat/sessions/{session_id}/messages")
    }

    pub fn rate_session(widget_id: &str, session_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/chat/sessions/{session_id}/rate")
    }

    pub fn request_handoff(widget_id: &str, session_id: &str) -> String {
        format!("{BASE_PATH}/widget/{widget_id}/chat/sessions/{session_id}/handoff")
    }
}

/// Real-time event names.
pub mod socket_events {
    // Client -> Server
    pub const JOIN_SESSION: &str = "session:join";
    pub const LEAVE_SESSION: &str = "session:leave";
    pub const VISITOR_TYPING: &str = "visitor:typing";
    pub const VISITOR_STOP_TYPING: &str = "visitor:stop-typing";

    // Server -> Client
    pub const NEW_MESSAGE: &str = "message:new";
    pub const SESSION_UPDATED: &str = "session:updated";
    pub const SESSION_CLOSED: &str = "session:closed";
    pub const AGENT_TYPING: &str = "agent:typing";
}

/// Local persistence keys.
pub mod storage_keys {
    pub const VISITOR_ID: &str = "msgmorph_visitor_id";
    pub const ACTIVE_SESSION_ID: &str = "msgmorph_active_session";
}

/// Visitor-identifying request headers.
pub mod headers {
    pub const VISITOR_ID: &str = "X-Visitor-Id";
    pub const VISITOR_NAME: &str = "X-Visitor-Name";
}
