//! # Chat Session
//!
//! Orchestrates the chat session lifecycle: visitor identity resolution,
//! session recovery-or-creation, backlog load, transport attach, live event
//! fusion, optimistic sending with rollback, typing debounce, and teardown.

pub mod manager;
pub mod state;

// Re-exports
pub use manager::{ChatSessionManager, StartChatParams};
pub use state::ChatState;
