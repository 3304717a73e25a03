//! Error types for the broker boundary.

use thiserror::Error;

/// Errors surfaced by broker clients and the codec layer.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("subscribe to topic '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("poll failed: {0}")]
    Poll(String),

    #[error("reader '{0}' is disconnected")]
    Disconnected(String),

    #[error("no codec registered for compression id {0}")]
    UnknownCodec(u8),

    #[error("codec failure: {0}")]
    Codec(String),
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
