//! Compression codecs and the codec registry.
//!
//! Codecs are strategy objects collected into an immutable [`CodecRegistry`]
//! that is built once at process start and handed to broker configuration
//! by reference. There is no process-global registration: a reader only
//! knows the codecs its registry carries.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::error::{BrokerError, Result};

/// Wire identifier for a compression scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompressionId {
    #[default]
    None,
    Gzip,
}

impl CompressionId {
    /// Numeric wire id.
    pub fn id(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Gzip => 1,
        }
    }

    /// Parse a numeric wire id.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::None),
            1 => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// A compression strategy.
pub trait CompressionCodec: Send + Sync {
    fn id(&self) -> CompressionId;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Identity codec for uncompressed payloads.
pub struct NoneCodec;

impl CompressionCodec for NoneCodec {
    fn id(&self) -> CompressionId {
        CompressionId::None
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Gzip codec backed by flate2.
pub struct GzipCodec {
    level: flate2::Compression,
}

impl GzipCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionCodec for GzipCodec {
    fn id(&self) -> CompressionId {
        CompressionId::Gzip
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| BrokerError::Codec(e.to_string()))?;
        encoder.finish().map_err(|e| BrokerError::Codec(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| BrokerError::Codec(e.to_string()))?;
        Ok(decompressed)
    }
}

/// Immutable mapping from compression id to codec.
///
/// Built once, never mutated after construction, shared by reference.
pub struct CodecRegistry {
    codecs: HashMap<CompressionId, Box<dyn CompressionCodec>>,
}

impl CodecRegistry {
    /// Build a registry from an explicit codec list.
    pub fn new(codecs: Vec<Box<dyn CompressionCodec>>) -> Self {
        let codecs = codecs.into_iter().map(|c| (c.id(), c)).collect();
        Self { codecs }
    }

    /// A registry carrying only the identity codec.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(vec![Box::new(NoneCodec)])
    }

    /// Look up the codec for an id.
    pub fn get(&self, id: CompressionId) -> Result<&dyn CompressionCodec> {
        self.codecs
            .get(&id)
            .map(|c| c.as_ref())
            .ok_or(BrokerError::UnknownCodec(id.id()))
    }

    /// Compress `data` with the codec registered for `id`.
    pub fn compress(&self, id: CompressionId, data: &[u8]) -> Result<Vec<u8>> {
        self.get(id)?.compress(data)
    }

    /// Decompress `data` with the codec registered for `id`.
    pub fn decompress(&self, id: CompressionId, data: &[u8]) -> Result<Vec<u8>> {
        self.get(id)?.decompress(data)
    }
}

impl Default for CodecRegistry {
    /// The standard registry: identity and gzip.
    fn default() -> Self {
        Self::new(vec![Box::new(NoneCodec), Box::new(GzipCodec::new())])
    }
}
