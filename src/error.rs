//! Status bridge error types

use thiserror::Error;

/// Status bridge error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No gateway token could be resolved from any source
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Gateway connection error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Gateway rejected the connect handshake
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    /// Required status target could not be written
    #[error("Publish error: {0}")]
    Publish(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
    /// Whether the reconnect loop can recover from this error.
    ///
    /// A missing credential fails identically on every attempt, so it is the
    /// one condition that stops the bridge.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Credentials(_) | Self::Config(_))
    }
}

/// Result type alias for status bridge operations
pub type Result<T> = std::result::Result<T, Error>;
