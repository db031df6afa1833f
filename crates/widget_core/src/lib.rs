//! widget_core - Shared data model for the widget SDK
//!
//! Defines the session/message/widget wire types, the REST and socket
//! constants, and the SDK configuration shared by every other crate.

pub mod config;
pub mod constants;
pub mod message;
pub mod session;
pub mod widget;

// Re-export commonly used types
pub use config::SdkConfig;
pub use message::{ChatMessage, MessageAttachment, MessageSenderType};
pub use session::{ChatSession, ChatSessionStatus, ChatSessionUpdate, StartChatResult};
pub use widget::{
    CollectionRequirement, CustomField, DeviceContext, FeedbackKind, FeedbackRequest,
    FeedbackResponse, PreChatForm, PreChatFormField, WidgetBranding, WidgetConfig, WidgetItem,
    WidgetItemKind,
};
