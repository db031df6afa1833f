//! Widget configuration and feedback types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Whether a contact field is collected on submission forms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollectionRequirement {
    Required,
    Optional,
    None,
}

impl Default for CollectionRequirement {
    fn default() -> Self {
        Self::None
    }
}

/// Category of a feedback submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackKind {
    Issue,
    FeatureRequest,
    Feedback,
    Other,
}

/// Entry in the widget's home menu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WidgetItemKind {
    Issue,
    FeatureRequest,
    Feedback,
    Other,
    LiveChat,
    Link,
}

/// Visual configuration of the widget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetBranding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,

    /// "bottom-right" or "bottom-left".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thank_you_message: Option<String>,
}

/// Menu item shown on the widget home screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WidgetItemKind,
    pub label: String,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Project-defined extra field on the feedback form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: String,
    pub label: String,
    /// "text", "textarea", "select", or "checkbox".
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Field on the pre-chat form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreChatFormField {
    pub id: String,
    pub label: String,
    /// "text", "email", or "select".
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Form shown before a chat session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreChatForm {
    pub enabled: bool,
    #[serde(default)]
    pub fields: Vec<PreChatFormField>,
}

/// Remote configuration for one widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub project_id: String,

    pub public_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    #[serde(default)]
    pub branding: WidgetBranding,

    #[serde(default)]
    pub items: Vec<WidgetItem>,

    #[serde(default)]
    pub collect_email: CollectionRequirement,

    #[serde(default)]
    pub collect_name: CollectionRequirement,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_chat_greeting: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_wait_time: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_chat_form: Option<PreChatForm>,
}

/// Host device details attached to feedback submissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

/// One feedback submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,

    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_fields: HashMap<String, serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_context: Option<DeviceContext>,
}

impl FeedbackRequest {
    /// Drop empty contact fields so optional-field validation on the server
    /// is never tripped by empty strings.
    pub fn normalized(mut self) -> Self {
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }
}

/// Server acknowledgement of a feedback submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message_id: String,
}
