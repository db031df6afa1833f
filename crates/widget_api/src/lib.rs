pub mod client;
pub mod error;
pub mod gateway;

pub use client::{ApiClient, StartChatRequest};
pub use error::{ApiError, Result};
pub use gateway::ChatGateway;
