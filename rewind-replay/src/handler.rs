//! The external-facing replay operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use rewind_broker::{FetchOptions, ReaderFactory};

use crate::collect::Collector;
use crate::decode::{DecodeService, Decoder};
use crate::error::Result;
use crate::request::{ReplayRequest, ScanMode};
use crate::result::{
    CollectedMessages, ReplayResult, ReplaySummary, ScanOutcome, TypeSummary, WindowSummary,
};
use crate::session::ReplaySession;

/// Validates requests, runs one session each, and assembles results.
///
/// The handler never retries: a caller that wants another attempt issues a
/// new request, which gets a new disposable reader group.
pub struct ReplayHandler {
    factory: Arc<dyn ReaderFactory>,
    options: FetchOptions,
    schema: Option<Arc<dyn DecodeService>>,
}

impl ReplayHandler {
    pub fn new(factory: Arc<dyn ReaderFactory>) -> Self {
        Self {
            factory,
            options: FetchOptions::default(),
            schema: None,
        }
    }

    #[must_use]
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Route decoding through an external schema service instead of the
    /// built-in JSON decoder.
    #[must_use]
    pub fn with_decode_service(mut self, service: Arc<dyn DecodeService>) -> Self {
        self.schema = Some(service);
        self
    }

    /// Execute one replay request.
    pub async fn execute(&self, request: ReplayRequest) -> Result<ReplayResult> {
        request.validate()?;

        let decoder = match &self.schema {
            Some(service) => Decoder::Schema {
                service: Arc::clone(service),
            },
            None => Decoder::Json {
                encoding: request.encoding,
            },
        };

        let session = ReplaySession::new(request.clone());
        info!(
            topic = %request.topic,
            group = %session.group_id(),
            "executing replay request"
        );
        let report = session.run(self.factory.as_ref(), &self.options, &decoder).await?;

        Ok(Self::assemble(request, report.outcome, report.collector, report.processed, report.elapsed))
    }

    fn assemble(
        request: ReplayRequest,
        outcome: ScanOutcome,
        collector: Collector,
        processed: u64,
        elapsed: std::time::Duration,
    ) -> ReplayResult {
        let (messages, types, window) = match collector {
            Collector::Buckets(buckets) => {
                let buckets = buckets.into_buckets();
                let types = buckets
                    .iter()
                    .map(|(ty, msgs)| {
                        (
                            ty.clone(),
                            TypeSummary {
                                count: msgs.len(),
                                latest_timestamp_ms: msgs.iter().map(|m| m.timestamp_ms).max(),
                            },
                        )
                    })
                    .collect::<BTreeMap<_, _>>();
                (CollectedMessages::Buckets(buckets), Some(types), None)
            }
            Collector::Window(window) => {
                let entries = window.into_entries();
                let ScanMode::OffsetWindowed {
                    target_offset,
                    direction,
                } = &request.mode
                else {
                    unreachable!("window collector only exists for windowed requests");
                };
                let summary = WindowSummary {
                    direction: *direction,
                    target_offset: *target_offset,
                    oldest_offset: entries.iter().map(|m| m.offset).min(),
                    newest_offset: entries.iter().map(|m| m.offset).max(),
                };
                (CollectedMessages::Window(entries), None, Some(summary))
            }
        };

        let collected = match &messages {
            CollectedMessages::Buckets(buckets) => buckets.values().map(Vec::len).sum(),
            CollectedMessages::Window(entries) => entries.len(),
        };

        ReplayResult {
            request,
            outcome,
            messages,
            summary: ReplaySummary {
                processed,
                collected,
                elapsed_ms: elapsed.as_millis() as u64,
                types,
                window,
            },
        }
    }
}
