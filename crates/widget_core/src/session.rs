//! Chat session types and the partial-update merge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a chat session.
///
/// A session moves monotonically toward a terminal state: once `Closed` or
/// `Expired` it never returns to a live status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatSessionStatus {
    /// Created, waiting for an agent to pick it up.
    Pending,
    /// An agent is engaged.
    Active,
    /// Being handed to another agent.
    Transferring,
    /// Ended by either side.
    Closed,
    /// Timed out server-side.
    Expired,
}

impl ChatSessionStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Expired)
    }

    /// Whether the session counts as live for the UI.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

/// One chat engagement between a visitor and an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,

    /// Owning project id.
    pub project_id: String,

    pub visitor_id: String,

    /// Transport routing key for the session room.
    pub room_id: String,

    pub status: ChatSessionStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial session update pushed over the real-time channel.
///
/// Every field is optional; unknown fields are rejected rather than
/// silently merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatSessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ChatSessionStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// Merge a partial update field-by-field.
    ///
    /// A terminal status is never reverted: a stale `ACTIVE` arriving after
    /// the session closed leaves the status untouched.
    pub fn apply_update(&mut self, update: &ChatSessionUpdate) {
        if let Some(status) = update.status {
            if !self.status.is_terminal() {
                self.status = status;
            }
        }
        if let Some(name) = &update.visitor_name {
            self.visitor_name = Some(name.clone());
        }
        if let Some(email) = &update.visitor_email {
            self.visitor_email = Some(email.clone());
        }
        if let Some(agent_id) = &update.assigned_agent_id {
            self.assigned_agent_id = Some(agent_id.clone());
        }
        if let Some(agent_name) = &update.assigned_agent_name {
            self.assigned_agent_name = Some(agent_name.clone());
        }
        if let Some(subject) = &update.subject {
            self.subject = Some(subject.clone());
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        if let Some(count) = update.message_count {
            self.message_count = Some(count);
        }
        if let Some(ts) = update.last_message_at {
            self.last_message_at = Some(ts);
        }
    }

    /// Force the session into `CLOSED`, regardless of prior status.
    pub fn force_closed(&mut self) {
        self.status = ChatSessionStatus::Closed;
    }
}

/// Result of starting or recovering a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatResult {
    pub session: ChatSession,
    pub room_id: String,
}
