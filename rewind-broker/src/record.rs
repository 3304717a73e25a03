//! Raw record types on the broker side of the decode boundary.

use std::collections::HashMap;

use crate::codec::CompressionId;

/// One record as delivered by a broker reader, before any decoding.
///
/// `offset` is monotonic per partition and broker-assigned; it is treated
/// as an opaque ordered integer everywhere downstream. The payload has
/// already been decompressed by the reader through the codec registry.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: Option<Vec<u8>>,
    pub timestamp_ms: i64,
    pub headers: HashMap<String, Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

/// Publish-side input accepted by the in-memory broker.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub key: Option<Vec<u8>>,
    pub headers: HashMap<String, Vec<u8>>,
    pub timestamp_ms: i64,
    pub payload: Option<Vec<u8>>,
    pub compression: CompressionId,
}

impl NewRecord {
    /// A payload-only record with no key, headers, or compression.
    pub fn payload(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Some(payload.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: CompressionId) -> Self {
        self.compression = compression;
        self
    }
}
