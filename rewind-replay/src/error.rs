//! Error types for the replay engine.

use rewind_broker::BrokerError;
use thiserror::Error;

/// Session- and request-level failures.
///
/// Per-message decode problems are not represented here: they are absorbed
/// into the affected message as `decode_error`. A timeout is not an error
/// either; it is a legitimate outcome carried in the result.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Malformed request, rejected before any reader is created.
    #[error("invalid replay request: {0}")]
    Validation(String),

    /// The disposable reader could not be created, connected, or subscribed.
    #[error("reader setup failed: {0}")]
    Connection(#[source] BrokerError),

    /// The broker failed mid-scan.
    #[error("broker failure during scan: {0}")]
    Broker(#[source] BrokerError),

    /// The schema decode service is unreachable (session-fatal, unlike a
    /// single malformed payload).
    #[error("decode service unavailable: {0}")]
    DecodeUnavailable(String),
}

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;
