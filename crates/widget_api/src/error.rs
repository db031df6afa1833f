//! Gateway error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response; carries the server-provided message when the body
    /// supplied one.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Status code of a server rejection, when this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
