//! Collection policies: pure accumulation over decoded messages.

use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;

use crate::decode::DecodedMessage;
use crate::request::{ReplayRequest, ScanDirection, ScanMode};

/// Fields probed for a message's logical type, in priority order.
///
/// The order is a contract: changing it changes observable behavior.
const TYPE_PROBES: [&str; 5] = ["type", "messageType", "eventType", "kind", "msgType"];

/// Sentinel type for messages carrying no recognizable type field.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Detect the logical type of a decoded value.
///
/// Probes [`TYPE_PROBES`] in order and returns the first non-empty string
/// match, falling back to [`UNKNOWN_TYPE`].
pub fn detect_type(value: &Value) -> &str {
    TYPE_PROBES
        .iter()
        .find_map(|probe| value.get(probe).and_then(Value::as_str).filter(|t| !t.is_empty()))
        .unwrap_or(UNKNOWN_TYPE)
}

/// Per-type accumulation with a FIFO cap per bucket.
///
/// Buckets are pre-seeded with every requested type, so the final result
/// always carries all requested keys, possibly empty.
#[derive(Debug)]
pub struct TypeBuckets {
    cap: usize,
    buckets: BTreeMap<String, VecDeque<DecodedMessage>>,
}

impl TypeBuckets {
    pub fn new<I, S>(requested_types: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cap,
            buckets: requested_types
                .into_iter()
                .map(|t| (t.into(), VecDeque::new()))
                .collect(),
        }
    }

    /// Offer one message; returns whether it was retained.
    ///
    /// Messages with a decode error are never bucket-eligible. A full
    /// bucket evicts its oldest entry, so each bucket holds the most
    /// recent `cap` matches.
    pub fn offer(&mut self, msg: DecodedMessage) -> bool {
        if msg.decode_error.is_some() {
            return false;
        }
        let bucket = {
            let detected = msg.body.as_value().map_or(UNKNOWN_TYPE, detect_type);
            match self.buckets.get_mut(detected) {
                Some(bucket) => bucket,
                None => return false,
            }
        };
        bucket.push_back(msg);
        if bucket.len() > self.cap {
            bucket.pop_front();
        }
        true
    }

    /// True iff every requested type has exactly `cap` retained messages.
    pub fn all_full(&self) -> bool {
        self.buckets.values().all(|b| b.len() == self.cap)
    }

    /// Total retained messages across buckets.
    pub fn total(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }

    pub fn into_buckets(self) -> BTreeMap<String, Vec<DecodedMessage>> {
        self.buckets
            .into_iter()
            .map(|(ty, bucket)| (ty, bucket.into_iter().collect()))
            .collect()
    }
}

/// Direction-aware window around a target offset, with a FIFO cap.
#[derive(Debug)]
pub struct OffsetWindow {
    target_offset: u64,
    direction: ScanDirection,
    cap: usize,
    entries: VecDeque<DecodedMessage>,
    complete: bool,
}

impl OffsetWindow {
    pub fn new(target_offset: u64, direction: ScanDirection, cap: usize) -> Self {
        Self {
            target_offset,
            direction,
            cap,
            entries: VecDeque::new(),
            complete: false,
        }
    }

    /// Offer one message; returns whether it was retained.
    ///
    /// Forward: retains offsets strictly after the target until the window
    /// is full. Backward: retains offsets strictly before the target,
    /// evicting oldest; the first offset at or past the target finalizes
    /// the window whatever its size.
    pub fn offer(&mut self, msg: DecodedMessage) -> bool {
        if self.complete {
            return false;
        }
        match self.direction {
            ScanDirection::Forward => {
                if msg.offset <= self.target_offset {
                    return false;
                }
                self.entries.push_back(msg);
                if self.entries.len() == self.cap {
                    self.complete = true;
                }
                true
            }
            ScanDirection::Backward => {
                if msg.offset >= self.target_offset {
                    // Boundary marker: finalizes the window, never enters it.
                    self.complete = true;
                    return false;
                }
                self.entries.push_back(msg);
                if self.entries.len() > self.cap {
                    self.entries.pop_front();
                }
                true
            }
        }
    }

    /// True once the window is final and further records are off-limits.
    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DecodedMessage> {
        self.entries.into_iter().collect()
    }
}

/// The active collection policy for one session.
#[derive(Debug)]
pub enum Collector {
    Buckets(TypeBuckets),
    Window(OffsetWindow),
}

impl Collector {
    /// Build the policy a request asks for.
    pub fn for_request(request: &ReplayRequest) -> Self {
        match &request.mode {
            ScanMode::TypeBucketed { requested_types } => Self::Buckets(TypeBuckets::new(
                requested_types.iter().cloned(),
                request.max_messages,
            )),
            ScanMode::OffsetWindowed {
                target_offset,
                direction,
            } => Self::Window(OffsetWindow::new(
                *target_offset,
                *direction,
                request.max_messages,
            )),
        }
    }

    pub fn offer(&mut self, msg: DecodedMessage) -> bool {
        match self {
            Self::Buckets(buckets) => buckets.offer(msg),
            Self::Window(window) => window.offer(msg),
        }
    }

    /// The policy-satisfied early-stop signal.
    pub fn satisfied(&self) -> bool {
        match self {
            Self::Buckets(buckets) => buckets.all_full(),
            Self::Window(window) => window.complete(),
        }
    }

    /// Retained message count.
    pub fn collected(&self) -> usize {
        match self {
            Self::Buckets(buckets) => buckets.total(),
            Self::Window(window) => window.len(),
        }
    }
}
