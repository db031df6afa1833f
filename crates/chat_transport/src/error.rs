//! Transport error types

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("transport has been disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
