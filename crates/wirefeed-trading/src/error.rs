//! Error type for trading commands.

use thiserror::Error;
use wirefeed_transport::TransportError;

pub type TradingResult<T> = Result<T, TradingError>;

#[derive(Error, Debug)]
pub enum TradingError {
    /// The venue answered the command with an `error` reply.
    #[error("Rejected by server: {message}")]
    Rejected { message: String },

    /// The command never got a usable answer: timeout, wrong reply type, or
    /// the channel is gone.
    #[error(transparent)]
    Transport(TransportError),

    /// The reply did not have the expected shape.
    #[error("Invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<TransportError> for TradingError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Remote { message } => Self::Rejected { message },
            other => Self::Transport(other),
        }
    }
}

impl TradingError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::RequestTimeout { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn remote_errors_become_rejections() {
        let err: TradingError = TransportError::remote("insufficient balance").into();
        assert!(matches!(err, TradingError::Rejected { ref message } if message == "insufficient balance"));
        assert_eq!(err.to_string(), "Rejected by server: insufficient balance");
    }

    #[test]
    fn other_transport_errors_pass_through() {
        let err: TradingError = TransportError::request_timeout(Duration::from_secs(10), "01J").into();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Request 01J timed out after 10s"
        );
    }
}
