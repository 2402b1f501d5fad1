//! Error handling for the messaging channel.

use std::{string::FromUtf8Error, time::Duration};

use thiserror::Error;

/// The main result type used throughout the transport layer.
pub type TransportResult<T> = Result<T, TransportError>;

/// Error type for every channel operation.
///
/// Transport-level failures are recovered by reconnection and only reach the
/// caller as events; request-level failures are returned to the one caller that
/// issued the request.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying socket failed to open, write or read.
    #[error("WebSocket error: {message}")]
    WebSocket { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An operation such as a connection attempt did not finish in time.
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// A correlated request received no reply before its deadline.
    #[error("Request {correlation_id} timed out after {duration:?}")]
    RequestTimeout {
        duration: Duration,
        correlation_id: String,
    },

    /// A correlated reply arrived with a type other than the one expected.
    #[error(
        "Unexpected response type for request {correlation_id}: expected {expected}, got {actual}"
    )]
    UnexpectedResponseType {
        correlation_id: String,
        expected: String,
        actual: String,
    },

    /// The remote endpoint answered a correlated request with an error envelope.
    #[error("Remote error: {message}")]
    Remote { message: String },

    /// Automatic reconnection gave up for this session.
    #[error("Max reconnection attempts ({attempts}) exceeded")]
    ReconnectExhausted { attempts: u32 },

    /// The connection or its actor is gone.
    #[error("Connection closed{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConnectionClosed { reason: Option<String> },

    /// Too many requests are outstanding.
    #[error("Capacity exceeded: {message}")]
    CapacityExceeded { message: String },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<FromUtf8Error> for TransportError {
    fn from(e: FromUtf8Error) -> Self {
        Self::Serialization(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        )))
    }
}

#[cfg(feature = "tungstenite")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket {
            message: e.to_string(),
        }
    }
}

impl TransportError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a WebSocket error.
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a request timeout error.
    pub fn request_timeout(duration: Duration, correlation_id: impl Into<String>) -> Self {
        Self::RequestTimeout {
            duration,
            correlation_id: correlation_id.into(),
        }
    }

    /// Create an unexpected response type error.
    pub fn unexpected_response_type(
        correlation_id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::UnexpectedResponseType {
            correlation_id: correlation_id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a remote error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a connection closed error.
    pub fn connection_closed(reason: Option<String>) -> Self {
        Self::ConnectionClosed { reason }
    }

    /// Create a capacity exceeded error.
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            message: message.into(),
        }
    }

    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }
}
