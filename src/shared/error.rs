//! Client Error Types
//!
//! Centralized error handling for the timer client.

use std::time::Duration;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Unknown command field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Connection manager has stopped")]
    ManagerStopped,
}

/// Failures of the underlying WebSocket link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connect attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("Connection closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Reasons an inbound status frame is discarded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Status frame is not a JSON object")]
    NotAnObject,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field: {0}")]
    InvalidField(&'static str),

    #[error("Finish timestamp {finish} precedes start timestamp {start}")]
    FinishBeforeStart { start: u64, finish: u64 },
}

impl ClientError {
    /// Shorthand for a rejected command value.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
