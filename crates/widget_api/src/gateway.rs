//! Gateway trait - the session-lifecycle subset of the API surface
//!
//! The lifecycle manager depends on this trait rather than `ApiClient`
//! directly so tests can substitute a scripted implementation.

use async_trait::async_trait;

use widget_core::{ChatMessage, StartChatResult};

use crate::client::StartChatRequest;
use crate::error::Result;

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Look up an existing active session for this visitor. `Ok(None)`
    /// means the visitor has no session; `Err` means the lookup itself
    /// failed (outage, not absence).
    async fn recover_session(&self, visitor_id: &str) -> Result<Option<StartChatResult>>;

    /// Create a new session. The only establishment call that fails loudly.
    async fn start_chat(&self, request: StartChatRequest) -> Result<StartChatResult>;

    /// Fetch the message backlog for a session.
    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Send a visitor message. Identity travels via request headers.
    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        visitor_id: &str,
        visitor_name: Option<&str>,
    ) -> Result<ChatMessage>;

    /// Rate a finished session.
    async fn rate_session(&self, session_id: &str, rating: u8, feedback: Option<&str>)
        -> Result<()>;
}
