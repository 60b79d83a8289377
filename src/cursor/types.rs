//! Cursor state types
//!
//! The unit that survives across sync invocations is a per-file history
//! map: file URI to the last-modified timestamp at which the file was
//! last read. Timestamps serialize with microsecond precision so state
//! round-trips without losing ordering.

use crate::remote::RemoteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp format used in persisted state
pub const STATE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Timestamp format used on emitted record metadata fields
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Persisted cursor state for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBasedState {
    /// File URI -> last-modified timestamp at the time it was read
    #[serde(default, with = "history_serde")]
    pub history: BTreeMap<String, DateTime<Utc>>,
}

impl FileBasedState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a file was read at its current last-modified time
    ///
    /// Monotonic: an entry never moves backwards. Timestamps are held at
    /// microsecond precision, the same resolution they persist at, so a
    /// state round-trip compares equal to a fresh listing.
    pub fn observe(&mut self, file: &RemoteFile) {
        let last_modified = truncate_to_micros(file.last_modified);
        self.history
            .entry(file.uri.clone())
            .and_modify(|existing| {
                if last_modified > *existing {
                    *existing = last_modified;
                }
            })
            .or_insert(last_modified);
    }

    /// Whether a file is due for sync given its current last-modified
    ///
    /// Due = never seen, or modified strictly after the history entry.
    pub fn is_due(&self, file: &RemoteFile) -> bool {
        match self.history.get(&file.uri) {
            Some(seen) => truncate_to_micros(file.last_modified) > *seen,
            None => true,
        }
    }

    /// The furthest-progressed timestamp in the history, if any
    pub fn max_last_modified(&self) -> Option<DateTime<Utc>> {
        self.history.values().max().copied()
    }
}

/// Drop sub-microsecond precision; stores report nanoseconds but state
/// persists microseconds
fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::Timelike;
    dt.with_nanosecond(dt.nanosecond() / 1000 * 1000).unwrap_or(dt)
}

mod history_serde {
    use super::{DateTime, Utc, STATE_TIMESTAMP_FORMAT};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            map.iter()
                .map(|(k, v)| (k, v.format(STATE_TIMESTAMP_FORMAT).to_string())),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, DateTime<Utc>>, D::Error> {
        let raw: BTreeMap<String, String> = BTreeMap::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(k, v)| {
                let parsed = DateTime::parse_from_rfc3339(&v)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| D::Error::custom(format!("bad timestamp '{v}': {e}")))?;
                Ok((k, parsed))
            })
            .collect()
    }
}

/// A bounded unit of work for one read iteration
///
/// Typically all files due for one time bucket, or every file for a full
/// refresh. Not persisted beyond the sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Files in this slice, in listing order
    pub files: Vec<RemoteFile>,
}

impl Slice {
    /// Create a slice over the given files
    pub fn new(files: Vec<RemoteFile>) -> Self {
        Self { files }
    }

    /// Number of files in this slice
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether this slice has no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Where a stream's sync currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncProgress {
    /// No slice has been requested yet
    #[default]
    NotStarted,
    /// Slices are being read
    InProgress,
    /// The final checkpoint has been emitted
    Complete,
}
