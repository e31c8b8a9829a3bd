//! Error types for dbproxy-frontend

use thiserror::Error;

/// Main error type for the front-end
#[derive(Error, Debug)]
pub enum ProxyError {
    /// I/O error (network, file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed packet
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Packet received out of sequence for the current connection phase.
    ///
    /// Fatal to the connection: the transport closes it after reporting.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for ProxyError
pub type Result<T> = std::result::Result<T, ProxyError>;

impl From<serde_yaml::Error> for ProxyError {
    fn from(err: serde_yaml::Error) -> Self {
        ProxyError::Config(err.to_string())
    }
}

impl ProxyError {
    /// Whether this error means the peer broke the handshake sequence.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ProxyError::ProtocolViolation(_))
    }
}
