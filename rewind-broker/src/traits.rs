//! Core traits for disposable stream readers.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::FetchOptions;
use crate::error::Result;
use crate::record::RawRecord;

/// Position to start reading from when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Start from the earliest retained record.
    Earliest,
    /// Start from the end (new records only).
    Latest,
}

/// A stream reader scoped to a single reader group.
///
/// Readers are disposable: created for one request, connected, subscribed
/// to one topic, polled until the caller is done, then disconnected and
/// dropped. Implementations are not expected to survive reuse after
/// `disconnect`.
#[async_trait]
pub trait StreamReader: Send {
    /// Establish the connection to the broker.
    async fn connect(&mut self) -> Result<()>;

    /// Subscribe to a topic from the given start position.
    async fn subscribe(&mut self, topic: &str, position: StartPosition) -> Result<()>;

    /// Poll for the next batch of records, waiting up to `max_wait` when
    /// nothing is immediately available. An empty batch is not an error.
    ///
    /// Within one partition, records are delivered in non-decreasing
    /// offset order; across partitions no ordering is guaranteed.
    async fn poll(&mut self, max_records: usize, max_wait: Duration) -> Result<Vec<RawRecord>>;

    /// Tear the reader down. Idempotent.
    async fn disconnect(&mut self) -> Result<()>;

    /// The reader-group id this reader was created under.
    fn group_id(&self) -> &str;
}

/// Factory for disposable readers, supplied by the host.
///
/// The factory owns connection configuration (hosts, credentials, codecs);
/// callers own the group id, which must be unique per request.
#[async_trait]
pub trait ReaderFactory: Send + Sync {
    async fn create_reader(
        &self,
        group_id: &str,
        options: &FetchOptions,
    ) -> Result<Box<dyn StreamReader>>;
}
