//! Broker interface boundary for rewind.
//!
//! This crate defines the contract between the replay engine and whatever
//! message broker the host wires in: the raw record shape, the disposable
//! reader lifecycle, fetch tuning, and an explicit compression codec
//! registry. It also ships a partitioned in-memory broker that implements
//! the same contract for tests and local development.
//!
//! # Key Types
//!
//! - [`StreamReader`] / [`ReaderFactory`] - Traits a broker client implements
//! - [`RawRecord`] - One delivered record, pre-decode
//! - [`BrokerConfig`] / [`FetchOptions`] - Connection and fetch tuning
//! - [`CodecRegistry`] - Immutable compression-id to codec mapping
//! - [`MemoryBroker`] - Partitioned in-memory implementation

pub mod codec;
pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

// Re-exports
pub use codec::{CodecRegistry, CompressionCodec, CompressionId, GzipCodec, NoneCodec};
pub use config::{BrokerConfig, Credentials, FetchOptions};
pub use error::{BrokerError, Result};
pub use memory::{MemoryBroker, MemoryReader};
pub use record::{NewRecord, RawRecord};
pub use traits::{ReaderFactory, StartPosition, StreamReader};
