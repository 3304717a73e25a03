//! Bounded historical replay over partitioned message streams.
//!
//! Given a topic, a collection target, and a deadline, the engine spins up
//! a disposable reader group, scans from the earliest retained position,
//! accumulates a size-capped result, and stops as soon as the target is
//! satisfied or the deadline expires — then tears the reader down. Two
//! collection policies exist: type-bucketed (up to N examples per named
//! message type) and offset-windowed (N messages before or after a target
//! offset, with FIFO eviction).
//!
//! # Key Types
//!
//! - [`ReplayHandler`] - Validates requests and runs sessions
//! - [`ReplayRequest`] / [`ReplayResult`] - Caller-facing payloads
//! - [`ReplaySession`] - One request end-to-end, teardown guaranteed
//! - [`Decoder`] / [`DecodeService`] - Raw bytes to structured values
//! - [`TypeBuckets`] / [`OffsetWindow`] - The two collection policies
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rewind_broker::MemoryBroker;
//! use rewind_replay::{ReplayHandler, ReplayRequest};
//!
//! async fn example() -> Result<(), rewind_replay::ReplayError> {
//!     let broker = Arc::new(MemoryBroker::new());
//!     let handler = ReplayHandler::new(broker);
//!
//!     let request = ReplayRequest::type_bucketed("telemetry", ["alert", "sensor"])
//!         .with_max_messages(5);
//!     let result = handler.execute(request).await?;
//!
//!     println!("processed {} records", result.summary.processed);
//!     Ok(())
//! }
//! ```

pub mod collect;
pub mod decode;
pub mod error;
pub mod handler;
pub mod request;
pub mod result;
pub mod session;

// Re-exports
pub use collect::{Collector, OffsetWindow, TypeBuckets, UNKNOWN_TYPE, detect_type};
pub use decode::{
    DecodeService, DecodeServiceError, DecodedMessage, Decoder, MessageBody, TextEncoding,
};
pub use error::{ReplayError, Result};
pub use handler::ReplayHandler;
pub use request::{ReplayRequest, ScanDirection, ScanMode};
pub use result::{
    CollectedMessages, ReplayResult, ReplaySummary, ScanOutcome, TypeSummary, WindowSummary,
};
pub use session::{ReplaySession, SessionReport, replay_group_id};
