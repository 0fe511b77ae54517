use std::{
    collections::BTreeMap,
    time::{Duration, SystemTime},
};

use serde::Serialize;
use tokio::time::Instant;

use crate::entry::Entry;

/// A single timestamped line within a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEntry {
    pub timestamp: SystemTime,
    pub line: String,
}

/// All lines of one label set, in the order they were added
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    pub labels: String,
    pub entries: Vec<StreamEntry>,
}

/// Logical push request handed to the transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushRequest {
    pub streams: Vec<Stream>,
}

impl PushRequest {
    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.entries.len()).sum()
    }
}

/// Entries of a single tenant waiting to be pushed, grouped by stream key.
///
/// A batch only grows. Once rendered and handed to the sender it is dropped.
#[derive(Debug)]
pub struct Batch {
    tenant_id: String,
    streams: BTreeMap<String, Vec<StreamEntry>>,
    bytes: usize,
    entries: usize,
    created_at: Instant,
}

impl Batch {
    pub fn new<I>(tenant_id: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut batch = Self {
            tenant_id: tenant_id.to_owned(),
            streams: BTreeMap::new(),
            bytes: 0,
            entries: 0,
            created_at: Instant::now(),
        };
        for entry in entries {
            batch.add(entry);
        }
        batch
    }

    pub fn tenant_id(&self) -> &str {
        self.tenant_id.as_str()
    }

    pub fn add(&mut self, entry: Entry) {
        self.bytes += entry.size();
        self.entries += 1;
        let (labels, timestamp, line) = entry.into_parts();
        self.streams
            .entry(labels.canonical_key())
            .or_default()
            .push(StreamEntry { timestamp, line });
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes
    }

    /// Size the batch would have once `entry` is added
    pub fn size_bytes_after(&self, entry: &Entry) -> usize {
        self.bytes + entry.size()
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Renders one stream per label set and returns it with the number of
    /// entries it carries. The batch is left untouched.
    pub fn to_push_request(&self) -> (PushRequest, usize) {
        let streams = self
            .streams
            .iter()
            .map(|(labels, entries)| Stream {
                labels: labels.clone(),
                entries: entries.clone(),
            })
            .collect::<Vec<_>>();
        (PushRequest { streams }, self.entries)
    }
}
