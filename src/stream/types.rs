//! Protocol messages and read-side bookkeeping

use crate::types::{JsonObject, JsonValue, LogLevel};
use chrono::{DateTime, Utc};
use serde_json::json;

// ============================================================================
// Messages
// ============================================================================

/// A protocol message emitted during a read
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// One record
    Record {
        /// Stream name
        stream: String,
        /// Record data
        data: JsonObject,
        /// Timestamp when the record was emitted
        emitted_at: DateTime<Utc>,
    },

    /// State checkpoint
    State {
        /// Stream name
        stream: String,
        /// Cursor state snapshot
        state: JsonValue,
    },

    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, data: JsonObject) -> Self {
        Self::Record {
            stream: stream.into(),
            data,
            emitted_at: Utc::now(),
        }
    }

    /// Create a state message
    pub fn state(stream: impl Into<String>, state: JsonValue) -> Self {
        Self::State {
            stream: stream.into(),
            state,
        }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log message
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a warning log message
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Serialize to the line-oriented wire shape
    pub fn to_json(&self) -> JsonValue {
        match self {
            Message::Record {
                stream,
                data,
                emitted_at,
            } => json!({
                "type": "RECORD",
                "record": {
                    "stream": stream,
                    "data": data,
                    "emitted_at": emitted_at.timestamp_millis(),
                }
            }),
            Message::State { stream, state } => json!({
                "type": "STATE",
                "state": {
                    "stream": stream,
                    "data": state,
                }
            }),
            Message::Log { level, message } => json!({
                "type": "LOG",
                "log": {
                    "level": level,
                    "message": message,
                }
            }),
        }
    }
}

// ============================================================================
// Sync phase
// ============================================================================

/// Orchestrator state for one sync invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Computing the next slice
    Slicing,
    /// Producing records from a file
    ReadingFile,
    /// Emitting a state checkpoint
    Checkpointing,
    /// All slices exhausted, final checkpoint emitted
    Done,
    /// A fatal error stopped the sync
    Failed,
}

// ============================================================================
// Errors collector
// ============================================================================

/// One skipped file's error, kept for end-of-sync reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// URI of the offending file
    pub uri: String,
    /// Human-readable message
    pub message: String,
    /// Whether the user's data/config caused it
    pub is_user_error: bool,
}

/// Accumulates per-file errors that did not fail the sync
#[derive(Debug, Clone, Default)]
pub struct ErrorsCollector {
    errors: Vec<ErrorRecord>,
}

impl ErrorsCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn collect(&mut self, uri: impl Into<String>, error: &crate::error::Error) {
        self.errors.push(ErrorRecord {
            uri: uri.into(),
            message: error.to_string(),
            is_user_error: error.is_user_error(),
        });
    }

    /// Collected errors, in occurrence order
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Whether anything was collected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of collected errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

// ============================================================================
// Read statistics
// ============================================================================

/// Counters from one stream's read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Records emitted
    pub records_emitted: usize,
    /// Records dropped by the validation policy
    pub records_skipped: usize,
    /// Files fully processed
    pub files_processed: usize,
    /// Files skipped on parse errors
    pub files_skipped: usize,
    /// State checkpoints emitted
    pub checkpoints_emitted: usize,
}
