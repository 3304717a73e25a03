//! Message decoding: raw broker payloads into structured values.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use rewind_broker::RawRecord;

use crate::error::{ReplayError, Result};

/// Text encoding applied before the JSON parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Errors from an external decode service.
#[derive(Debug, thiserror::Error)]
pub enum DecodeServiceError {
    /// One payload could not be decoded; the session continues.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The service itself is unreachable; the session aborts.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// External schema decode service, supplied by the host.
#[async_trait]
pub trait DecodeService: Send + Sync {
    async fn decode(&self, payload: &[u8]) -> std::result::Result<Value, DecodeServiceError>;
}

/// Decoded message body.
///
/// `Raw` carries the original bytes when schema decoding failed and no
/// textual fallback applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    Structured(Value),
    Raw(Vec<u8>),
}

impl MessageBody {
    /// The structured value, if decoding produced one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// One broker record after decoding.
///
/// Constructed once per delivered record and never mutated afterwards; the
/// session either retains it (bucket/window) or discards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: Option<String>,
    pub timestamp_ms: i64,
    pub headers: HashMap<String, Vec<u8>>,
    pub body: MessageBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

/// Decoding strategy for one replay session.
#[derive(Clone)]
pub enum Decoder {
    /// JSON parse with plain-text fallback; never fails per message.
    Json { encoding: TextEncoding },
    /// Delegate to an external schema decode service.
    Schema { service: Arc<dyn DecodeService> },
}

impl Decoder {
    /// Decode one record.
    ///
    /// Per-message failures land in `decode_error` on the returned message;
    /// the only error path out of here is a session-fatal unavailable
    /// decode service.
    pub async fn decode(&self, record: RawRecord) -> Result<DecodedMessage> {
        let (body, decode_error) = match self {
            Self::Json { encoding } => (Self::decode_json(*encoding, record.payload.as_deref()), None),
            Self::Schema { service } => match record.payload.as_deref() {
                None | Some([]) => (MessageBody::Structured(json!({})), None),
                Some(payload) => match service.decode(payload).await {
                    Ok(value) => (MessageBody::Structured(value), None),
                    Err(DecodeServiceError::Malformed(reason)) => {
                        (MessageBody::Raw(payload.to_vec()), Some(reason))
                    }
                    Err(DecodeServiceError::Unavailable(reason)) => {
                        return Err(ReplayError::DecodeUnavailable(reason));
                    }
                },
            },
        };

        Ok(DecodedMessage {
            topic: record.topic,
            partition: record.partition,
            offset: record.offset,
            key: record.key.map(|k| String::from_utf8_lossy(&k).into_owned()),
            timestamp_ms: record.timestamp_ms,
            headers: record.headers,
            body,
            decode_error,
        })
    }

    fn decode_json(encoding: TextEncoding, payload: Option<&[u8]>) -> MessageBody {
        let bytes = match payload {
            None | Some([]) => return MessageBody::Structured(json!({})),
            Some(bytes) => bytes,
        };
        let text = encoding.decode(bytes);
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => MessageBody::Structured(value),
            // Plain text is a degraded-but-valid value, not an error.
            Err(_) => MessageBody::Structured(json!({ "content": text })),
        }
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json { encoding } => f.debug_struct("Json").field("encoding", encoding).finish(),
            Self::Schema { .. } => f.write_str("Schema"),
        }
    }
}
