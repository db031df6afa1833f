//! Chat message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageSenderType {
    Visitor,
    Agent,
    System,
}

/// File attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttachment {
    pub id: String,
    pub name: String,
    pub url: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
}

/// A single message within a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,

    pub session_id: String,

    pub sender_type: MessageSenderType,

    pub sender_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    pub content: String,

    /// Server-side message kind (e.g. "text"); opaque to the SDK.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,

    pub created_at: DateTime<Utc>,
}
