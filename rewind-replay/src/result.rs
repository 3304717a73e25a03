//! Result payloads assembled after a replay session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decode::DecodedMessage;
use crate::request::{ReplayRequest, ScanDirection};

/// How the scan ended.
///
/// Both outcomes carry a result; `TimedOut` simply means the collection
/// may be partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Satisfied,
    TimedOut,
}

/// Messages retained by the session, shaped by the request mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectedMessages {
    /// Every requested type, possibly with an empty list.
    Buckets(BTreeMap<String, Vec<DecodedMessage>>),
    /// The single offset window, in arrival order.
    Window(Vec<DecodedMessage>),
}

/// Per-type counts for bucketed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub count: usize,
    /// Most recent broker timestamp among retained messages of this type.
    pub latest_timestamp_ms: Option<i64>,
}

/// Window bounds for offset-windowed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub direction: ScanDirection,
    pub target_offset: u64,
    pub oldest_offset: Option<u64>,
    pub newest_offset: Option<u64>,
}

/// Scan statistics, present on every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Records delivered and evaluated, matching or not.
    pub processed: u64,
    /// Records retained across buckets / the window.
    pub collected: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<BTreeMap<String, TypeSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowSummary>,
}

/// The full result of one replay request.
///
/// `request` echoes the effective (defaulted) parameters, so a caller can
/// distinguish "ran empty" from "ran and found nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub request: ReplayRequest,
    pub outcome: ScanOutcome,
    pub messages: CollectedMessages,
    pub summary: ReplaySummary,
}

impl ReplayResult {
    /// The bucket map, if this was a type-bucketed request.
    pub fn buckets(&self) -> Option<&BTreeMap<String, Vec<DecodedMessage>>> {
        match &self.messages {
            CollectedMessages::Buckets(buckets) => Some(buckets),
            CollectedMessages::Window(_) => None,
        }
    }

    /// The window, if this was an offset-windowed request.
    pub fn window(&self) -> Option<&[DecodedMessage]> {
        match &self.messages {
            CollectedMessages::Window(window) => Some(window),
            CollectedMessages::Buckets(_) => None,
        }
    }
}
