//! Configuration for broker connections and fetch tuning.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::CodecRegistry;

/// Fetch tuning for a disposable reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchOptions {
    /// Minimum bytes the broker should accumulate before answering a fetch.
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u32,

    /// Maximum bytes returned per fetch.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u32,

    /// Maximum time the broker may hold a fetch open waiting for data.
    #[serde(default = "default_max_wait", with = "humantime_serde")]
    pub max_wait: Duration,
}

fn default_min_bytes() -> u32 {
    1
}

fn default_max_bytes() -> u32 {
    1_048_576
}

fn default_max_wait() -> Duration {
    Duration::from_secs(1)
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            max_bytes: default_max_bytes(),
            max_wait: default_max_wait(),
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn with_min_bytes(mut self, min_bytes: u32) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u32) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// SASL-style credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connection configuration a broker client is built from.
///
/// The codec registry is shared, not serialized: hosts construct it once
/// at process start and pass it in.
#[derive(Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host:port list.
    pub hosts: Vec<String>,

    /// Client identifier reported to the broker.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Optional authentication.
    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// Fetch tuning applied to readers created under this config.
    #[serde(default)]
    pub fetch: FetchOptions,

    /// Compression codecs available to readers.
    #[serde(skip, default = "default_codecs")]
    pub codecs: Arc<CodecRegistry>,
}

fn default_client_id() -> String {
    "rewind".to_string()
}

fn default_codecs() -> Arc<CodecRegistry> {
    Arc::new(CodecRegistry::default())
}

impl BrokerConfig {
    /// Config for the given hosts with all defaults.
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            hosts,
            client_id: default_client_id(),
            credentials: None,
            fetch: FetchOptions::default(),
            codecs: default_codecs(),
        }
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    #[must_use]
    pub fn with_codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = codecs;
        self
    }
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("hosts", &self.hosts)
            .field("client_id", &self.client_id)
            .field("credentials", &self.credentials.as_ref().map(|c| c.username.as_str()))
            .field("fetch", &self.fetch)
            .finish()
    }
}
