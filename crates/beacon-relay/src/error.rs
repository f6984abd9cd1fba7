//! # Relay Error Types
//!
//! Error taxonomy for the relay layer. Connection-shaped failures are
//! retryable and feed the transport's backoff loop; protocol and config
//! failures are permanent and surface to the caller.

use thiserror::Error;

/// Result alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors produced by the relay layer.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failed to establish a WebSocket connection.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The hub rejected or never answered the Join handshake.
    #[error("Join handshake failed: {0}")]
    Handshake(String),

    /// A peer sent something the protocol does not allow.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// An internal channel closed while the relay still needed it.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Reconnection abandoned after exhausting the attempt budget.
    #[error("Gave up reconnecting after {attempts} attempts")]
    GaveUp { attempts: u32 },

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON encode/decode failure on a wire message.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem failure reading or writing the config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Whether the failure is worth another connection attempt.
    ///
    /// `GaveUp` is deliberately NOT retryable: it is the terminal outcome
    /// of retrying, and anything that maps it back into the retry loop
    /// would defeat the attempt bound.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::Connect(_) | RelayError::Handshake(_) | RelayError::ChannelClosed(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::Connect(err.to_string())
    }
}

impl From<url::ParseError> for RelayError {
    fn from(err: url::ParseError) -> Self {
        RelayError::InvalidConfig(format!("invalid URL: {err}"))
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::InvalidConfig(format!("invalid TOML: {err}"))
    }
}

impl From<toml::ser::Error> for RelayError {
    fn from(err: toml::ser::Error) -> Self {
        RelayError::InvalidConfig(format!("TOML serialization: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_errors_are_retryable() {
        assert!(RelayError::Connect("refused".into()).is_retryable());
        assert!(RelayError::Handshake("timeout".into()).is_retryable());
        assert!(RelayError::ChannelClosed("hub".into()).is_retryable());
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!RelayError::Protocol("bad frame".into()).is_retryable());
        assert!(!RelayError::InvalidConfig("no url".into()).is_retryable());
        assert!(!RelayError::GaveUp { attempts: 10 }.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::GaveUp { attempts: 10 };
        assert_eq!(err.to_string(), "Gave up reconnecting after 10 attempts");
    }
}
