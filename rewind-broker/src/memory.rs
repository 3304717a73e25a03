//! Partitioned in-memory broker for tests and local development.
//!
//! Simulates the broker behavior the replay engine must tolerate:
//!
//! - records are routed to partitions by key hash (keyless records
//!   round-robin), so offsets are partition-local, not global
//! - `poll` drains partitions fairly, so delivery interleaves partitions
//!   and is not globally offset-ordered
//! - payloads are compressed at publish time and decompressed on fetch
//!   through the codec registry

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::codec::{CodecRegistry, CompressionId};
use crate::config::{BrokerConfig, FetchOptions};
use crate::error::{BrokerError, Result};
use crate::record::{NewRecord, RawRecord};
use crate::traits::{ReaderFactory, StartPosition, StreamReader};

/// Default partition count per topic.
const DEFAULT_PARTITION_COUNT: u32 = 4;

/// One stored record; the payload is kept compressed as published.
#[derive(Debug, Clone)]
struct StoredRecord {
    key: Option<Vec<u8>>,
    headers: HashMap<String, Vec<u8>>,
    timestamp_ms: i64,
    payload: Option<Vec<u8>>,
    compression: CompressionId,
}

#[derive(Default)]
struct TopicState {
    partitions: Vec<Vec<StoredRecord>>,
    /// Next partition for keyless records.
    round_robin: usize,
}

struct SharedState {
    partition_count: u32,
    codecs: Arc<CodecRegistry>,
    topics: RwLock<HashMap<String, TopicState>>,
    notify: Notify,
}

/// Partitioned in-memory broker.
///
/// Topics exist implicitly: publishing to or subscribing to a topic that
/// was never seen before creates it empty.
pub struct MemoryBroker {
    shared: Arc<SharedState>,
}

impl MemoryBroker {
    /// Broker with the default partition count and codec registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_PARTITION_COUNT)
    }

    /// Broker with an explicit partition count per topic.
    #[must_use]
    pub fn with_partitions(partition_count: u32) -> Self {
        Self {
            shared: Arc::new(SharedState {
                partition_count: partition_count.max(1),
                codecs: Arc::new(CodecRegistry::default()),
                topics: RwLock::new(HashMap::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Replace the codec registry (must be called before publishing).
    #[must_use]
    pub fn with_codecs(self, codecs: Arc<CodecRegistry>) -> Self {
        Self {
            shared: Arc::new(SharedState {
                partition_count: self.shared.partition_count,
                codecs,
                topics: RwLock::new(HashMap::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Local stand-in for a configured broker: honors the config's codec
    /// registry, ignores hosts and credentials.
    #[must_use]
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new().with_codecs(Arc::clone(&config.codecs))
    }

    fn partition_for_key(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shared.partition_count as usize
    }

    /// Publish one record, returning its (partition, offset).
    pub async fn publish(&self, topic: &str, record: NewRecord) -> Result<(u32, u64)> {
        let payload = match record.payload {
            Some(bytes) => Some(self.shared.codecs.compress(record.compression, &bytes)?),
            None => None,
        };

        let mut topics = self.shared.topics.write().await;
        let state = topics.entry(topic.to_string()).or_default();
        if state.partitions.is_empty() {
            state.partitions = (0..self.shared.partition_count).map(|_| Vec::new()).collect();
        }

        let partition = match &record.key {
            Some(key) => self.partition_for_key(key),
            None => {
                let p = state.round_robin;
                state.round_robin = (state.round_robin + 1) % state.partitions.len();
                p
            }
        };

        let log = &mut state.partitions[partition];
        let offset = log.len() as u64;
        log.push(StoredRecord {
            key: record.key,
            headers: record.headers,
            timestamp_ms: record.timestamp_ms,
            payload,
            compression: record.compression,
        });
        drop(topics);

        self.shared.notify.notify_waiters();
        Ok((partition as u32, offset))
    }

    /// Publish a JSON value as an uncompressed, keyless record.
    pub async fn publish_json(&self, topic: &str, value: &serde_json::Value) -> Result<(u32, u64)> {
        let payload = serde_json::to_vec(value).map_err(|e| BrokerError::Codec(e.to_string()))?;
        self.publish(topic, NewRecord::payload(payload)).await
    }

    /// Total records stored for a topic across all partitions.
    pub async fn topic_len(&self, topic: &str) -> usize {
        let topics = self.shared.topics.read().await;
        topics
            .get(topic)
            .map(|t| t.partitions.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReaderFactory for MemoryBroker {
    async fn create_reader(
        &self,
        group_id: &str,
        _options: &FetchOptions,
    ) -> Result<Box<dyn StreamReader>> {
        Ok(Box::new(MemoryReader {
            shared: Arc::clone(&self.shared),
            group_id: group_id.to_string(),
            connected: false,
            subscription: None,
        }))
    }
}

struct Subscription {
    topic: String,
    /// Next offset to read, per partition.
    positions: Vec<u64>,
}

/// Reader over a [`MemoryBroker`] topic.
pub struct MemoryReader {
    shared: Arc<SharedState>,
    group_id: String,
    connected: bool,
    subscription: Option<Subscription>,
}

impl MemoryReader {
    /// Drain up to `max_records`, one record per partition per round so
    /// partitions interleave the way a real multi-partition fetch does.
    async fn drain(&mut self, max_records: usize) -> Result<Vec<RawRecord>> {
        let sub = self
            .subscription
            .as_mut()
            .ok_or_else(|| BrokerError::Poll("reader is not subscribed".to_string()))?;

        let topics = self.shared.topics.read().await;
        let Some(state) = topics.get(&sub.topic) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        loop {
            let mut progressed = false;
            for (partition, log) in state.partitions.iter().enumerate() {
                if out.len() == max_records {
                    return Ok(out);
                }
                let next = sub.positions[partition];
                if (next as usize) < log.len() {
                    let stored = &log[next as usize];
                    let payload = match &stored.payload {
                        Some(bytes) => {
                            Some(self.shared.codecs.decompress(stored.compression, bytes)?)
                        }
                        None => None,
                    };
                    out.push(RawRecord {
                        topic: sub.topic.clone(),
                        partition: partition as u32,
                        offset: next,
                        key: stored.key.clone(),
                        timestamp_ms: stored.timestamp_ms,
                        headers: stored.headers.clone(),
                        payload,
                    });
                    sub.positions[partition] = next + 1;
                    progressed = true;
                }
            }
            if !progressed {
                return Ok(out);
            }
        }
    }
}

#[async_trait]
impl StreamReader for MemoryReader {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        debug!(group = %self.group_id, "memory reader connected");
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, position: StartPosition) -> Result<()> {
        if !self.connected {
            return Err(BrokerError::Subscribe {
                topic: topic.to_string(),
                reason: "reader is not connected".to_string(),
            });
        }

        let topics = self.shared.topics.read().await;
        let partition_count = self.shared.partition_count as usize;
        let positions = match position {
            StartPosition::Earliest => vec![0; partition_count],
            StartPosition::Latest => match topics.get(topic) {
                Some(state) if !state.partitions.is_empty() => {
                    state.partitions.iter().map(|p| p.len() as u64).collect()
                }
                _ => vec![0; partition_count],
            },
        };

        self.subscription = Some(Subscription {
            topic: topic.to_string(),
            positions,
        });
        debug!(group = %self.group_id, topic, ?position, "memory reader subscribed");
        Ok(())
    }

    async fn poll(&mut self, max_records: usize, max_wait: Duration) -> Result<Vec<RawRecord>> {
        if !self.connected {
            return Err(BrokerError::Disconnected(self.group_id.clone()));
        }

        let deadline = tokio::time::Instant::now() + max_wait;
        let shared = Arc::clone(&self.shared);
        loop {
            // Register for wakeups before draining so a publish landing
            // between the two is not missed.
            let notified = shared.notify.notified();
            let batch = self.drain(max_records).await?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            tokio::select! {
                () = notified => {}
                () = tokio::time::sleep_until(deadline) => return Ok(Vec::new()),
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        debug!(group = %self.group_id, "memory reader disconnected");
        Ok(())
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }
}
