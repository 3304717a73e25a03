//! One replay session: disposable reader, scan loop, guaranteed teardown.

use std::time::Duration;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use rewind_broker::{FetchOptions, ReaderFactory, StartPosition, StreamReader};

use crate::collect::Collector;
use crate::decode::Decoder;
use crate::error::{ReplayError, Result};
use crate::request::ReplayRequest;
use crate::result::ScanOutcome;

/// Records requested per poll.
const POLL_BATCH: usize = 500;

/// Prefix for disposable reader-group names.
const GROUP_PREFIX: &str = "replay";

/// A collision-resistant reader-group id: prefix, wall-clock millis, and a
/// v4 UUID. Uniqueness across concurrent sessions is the contract;
/// unpredictability is not.
pub fn replay_group_id() -> String {
    format!(
        "{GROUP_PREFIX}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4()
    )
}

/// What a finished session hands back to the request handler.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: ScanOutcome,
    pub collector: Collector,
    pub processed: u64,
    pub elapsed: Duration,
}

/// Orchestrates one request end-to-end.
///
/// The session exclusively owns its reader and accumulation state, so the
/// scan loop runs without locks. The reader is disconnected exactly once
/// on every exit path; teardown failures are logged and never mask the
/// primary result or error.
pub struct ReplaySession {
    group_id: String,
    request: ReplayRequest,
    collector: Collector,
    processed: u64,
}

impl ReplaySession {
    pub fn new(request: ReplayRequest) -> Self {
        let collector = Collector::for_request(&request);
        Self {
            group_id: replay_group_id(),
            request,
            collector,
            processed: 0,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Run the session to completion.
    pub async fn run(
        mut self,
        factory: &dyn ReaderFactory,
        options: &FetchOptions,
        decoder: &Decoder,
    ) -> Result<SessionReport> {
        let started = tokio::time::Instant::now();
        debug!(
            group = %self.group_id,
            topic = %self.request.topic,
            timeout_ms = self.request.timeout.as_millis() as u64,
            "starting replay session"
        );

        let mut reader = factory
            .create_reader(&self.group_id, options)
            .await
            .map_err(ReplayError::Connection)?;

        let scanned = match Self::prepare(reader.as_mut(), &self.request.topic).await {
            Ok(()) => self.scan(reader.as_mut(), options, decoder).await,
            Err(e) => Err(e),
        };

        // Teardown on every exit path.
        if let Err(e) = reader.disconnect().await {
            warn!(group = %self.group_id, error = %e, "disposable reader teardown failed");
        } else {
            debug!(group = %self.group_id, "disposable reader disconnected");
        }

        let outcome = scanned?;
        let elapsed = started.elapsed();
        info!(
            group = %self.group_id,
            ?outcome,
            processed = self.processed,
            collected = self.collector.collected(),
            elapsed_ms = elapsed.as_millis() as u64,
            "replay session finished"
        );

        Ok(SessionReport {
            outcome,
            collector: self.collector,
            processed: self.processed,
            elapsed,
        })
    }

    async fn prepare(reader: &mut dyn StreamReader, topic: &str) -> Result<()> {
        reader.connect().await.map_err(ReplayError::Connection)?;
        // Historical replay always starts from the earliest retained
        // record, whatever a live consumer would prefer.
        reader
            .subscribe(topic, StartPosition::Earliest)
            .await
            .map_err(ReplayError::Connection)?;
        Ok(())
    }

    /// The read loop, racing the collection policy against the deadline.
    ///
    /// The deadline bounds the in-flight poll as well: if it fires while a
    /// poll is pending, the poll future is dropped and the remainder of
    /// any fetched batch is never evaluated.
    async fn scan(
        &mut self,
        reader: &mut dyn StreamReader,
        options: &FetchOptions,
        decoder: &Decoder,
    ) -> Result<ScanOutcome> {
        let deadline = tokio::time::sleep(self.request.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => {
                    debug!(group = %self.group_id, processed = self.processed, "deadline reached");
                    return Ok(ScanOutcome::TimedOut);
                }
                polled = reader.poll(POLL_BATCH, options.max_wait) => {
                    // Records already delivered in this batch are all
                    // evaluated; the policies themselves stop retaining
                    // once complete, and buckets keep evicting so they
                    // hold the most recent matches.
                    for record in polled.map_err(ReplayError::Broker)? {
                        self.processed += 1;
                        let msg = decoder.decode(record).await?;
                        let offset = msg.offset;
                        if self.collector.offer(msg) {
                            trace!(group = %self.group_id, offset, "retained message");
                        }
                    }
                    if self.collector.satisfied() {
                        debug!(
                            group = %self.group_id,
                            processed = self.processed,
                            "collection satisfied, stopping early"
                        );
                        return Ok(ScanOutcome::Satisfied);
                    }
                }
            }
        }
    }
}
