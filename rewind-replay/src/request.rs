//! Replay request payloads and validation.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decode::TextEncoding;
use crate::error::{ReplayError, Result};

/// Scan direction for offset-windowed replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    /// Collect messages after the target offset.
    Forward,
    /// Collect messages before the target offset.
    Backward,
}

/// What a replay session collects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanMode {
    /// Collect up to the cap per named message type.
    TypeBucketed { requested_types: BTreeSet<String> },
    /// Collect a window of messages around a target offset.
    OffsetWindowed {
        target_offset: u64,
        direction: ScanDirection,
    },
}

/// One replay invocation, immutable once validated.
///
/// Optional fields default as documented: `max_messages` 10, `timeout`
/// 30s, `encoding` UTF-8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRequest {
    pub topic: String,

    #[serde(flatten)]
    pub mode: ScanMode,

    /// Per-bucket cap in bucketed mode; window cap in windowed mode.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Scan deadline.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Text encoding for the JSON decoder.
    #[serde(default)]
    pub encoding: TextEncoding,
}

fn default_max_messages() -> usize {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ReplayRequest {
    /// Type-bucketed request with default cap, timeout, and encoding.
    pub fn type_bucketed<I, S>(topic: impl Into<String>, requested_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topic: topic.into(),
            mode: ScanMode::TypeBucketed {
                requested_types: requested_types.into_iter().map(Into::into).collect(),
            },
            max_messages: default_max_messages(),
            timeout: default_timeout(),
            encoding: TextEncoding::default(),
        }
    }

    /// Offset-windowed request with default cap, timeout, and encoding.
    pub fn offset_windowed(
        topic: impl Into<String>,
        target_offset: u64,
        direction: ScanDirection,
    ) -> Self {
        Self {
            topic: topic.into(),
            mode: ScanMode::OffsetWindowed {
                target_offset,
                direction,
            },
            max_messages: default_max_messages(),
            timeout: default_timeout(),
            encoding: TextEncoding::default(),
        }
    }

    #[must_use]
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Reject malformed requests before any reader exists.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(ReplayError::Validation("topic must not be empty".to_string()));
        }
        if self.max_messages == 0 {
            return Err(ReplayError::Validation(
                "max_messages must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ReplayError::Validation("timeout must be non-zero".to_string()));
        }
        if let ScanMode::TypeBucketed { requested_types } = &self.mode {
            if requested_types.is_empty() {
                return Err(ReplayError::Validation(
                    "requested_types must not be empty".to_string(),
                ));
            }
            if requested_types.iter().any(|t| t.trim().is_empty()) {
                return Err(ReplayError::Validation(
                    "requested_types must not contain blank names".to_string(),
                ));
            }
        }
        Ok(())
    }
}
