//! Cursor and checkpoint management
//!
//! One cursor per stream per sync, single-writer. The cursor partitions
//! the listed file set into slices, tracks progress as files complete,
//! and decides when a checkpoint is due: after every
//! `state_checkpoint_interval` records, and unconditionally at the end
//! of every slice and of the stream.
//!
//! Two strategies sit behind one trait: [`DefaultFileCursor`] manages a
//! per-file history itself, while [`LegacyStateCursor`] defers to the
//! caller's whole-state checkpointing by snapshotting `None`. The
//! strategy is selected at stream construction, and state always flows
//! in through the constructor, never through a live attribute.

mod types;


pub use types::{
    FileBasedState, Slice, SyncProgress, RECORD_TIMESTAMP_FORMAT, STATE_TIMESTAMP_FORMAT,
};

use crate::error::{Error, Result};
use crate::remote::RemoteFile;
use crate::types::{JsonValue, SyncMode};

/// Which cursor strategy a stream uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorKind {
    /// Self-managed per-file history cursor
    #[default]
    SelfManaged,
    /// Defer to the caller's whole-state checkpointing
    LegacyDelegated,
}

impl CursorKind {
    /// Build a cursor of this kind from the caller-supplied prior state
    pub fn build(
        self,
        checkpoint_interval: usize,
        prior_state: Option<&JsonValue>,
    ) -> Result<Box<dyn FileBasedCursor>> {
        match self {
            CursorKind::SelfManaged => Ok(Box::new(DefaultFileCursor::new(
                checkpoint_interval,
                prior_state,
            )?)),
            CursorKind::LegacyDelegated => Ok(Box::new(LegacyStateCursor::new())),
        }
    }
}

/// Per-stream sync progress tracking and checkpoint production
pub trait FileBasedCursor: Send {
    /// Partition the listed files into slices for this sync
    ///
    /// Transitions the cursor out of `NotStarted`. Incremental mode
    /// returns only files due for sync; full refresh returns everything
    /// in one slice. An empty result means no work, but the orchestrator
    /// still emits a final checkpoint equal to the prior state.
    fn compute_slices(&mut self, files: Vec<RemoteFile>, sync_mode: SyncMode) -> Vec<Slice>;

    /// Record that a file's records have been fully emitted
    fn observe_file(&mut self, file: &RemoteFile);

    /// Record one emitted record; true when the checkpoint interval
    /// boundary was crossed
    fn observe_record(&mut self) -> bool;

    /// Snapshot the current state for a checkpoint message
    ///
    /// `None` defers to legacy whole-state checkpointing.
    fn snapshot(&self) -> Option<JsonValue>;

    /// Where the sync currently stands
    fn progress(&self) -> SyncProgress;

    /// Mark the stream complete; called after the final checkpoint
    fn finish(&mut self);
}

// ============================================================================
// Self-managed cursor
// ============================================================================

/// Cursor tracking a per-file history of last-modified timestamps
#[derive(Debug)]
pub struct DefaultFileCursor {
    state: FileBasedState,
    checkpoint_interval: usize,
    records_since_checkpoint: usize,
    progress: SyncProgress,
}

impl DefaultFileCursor {
    /// Create a cursor, resuming from caller-supplied prior state
    pub fn new(checkpoint_interval: usize, prior_state: Option<&JsonValue>) -> Result<Self> {
        let state = match prior_state {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::state(format!("invalid stream state: {e}")))?,
            None => FileBasedState::new(),
        };

        Ok(Self {
            state,
            checkpoint_interval: checkpoint_interval.max(1),
            records_since_checkpoint: 0,
            progress: SyncProgress::NotStarted,
        })
    }

    /// The underlying state (read-only)
    pub fn state(&self) -> &FileBasedState {
        &self.state
    }
}

impl FileBasedCursor for DefaultFileCursor {
    fn compute_slices(&mut self, files: Vec<RemoteFile>, sync_mode: SyncMode) -> Vec<Slice> {
        self.progress = SyncProgress::InProgress;

        match sync_mode {
            SyncMode::FullRefresh => {
                if files.is_empty() {
                    Vec::new()
                } else {
                    vec![Slice::new(files)]
                }
            }
            SyncMode::Incremental => {
                // One slice per distinct timestamp, oldest first, so a
                // checkpoint taken between slices never runs ahead of an
                // unread older file
                let mut due: Vec<RemoteFile> =
                    files.into_iter().filter(|f| self.state.is_due(f)).collect();
                due.sort_by(|a, b| {
                    a.last_modified
                        .cmp(&b.last_modified)
                        .then_with(|| a.uri.cmp(&b.uri))
                });

                let mut slices: Vec<Slice> = Vec::new();
                for file in due {
                    match slices.last_mut() {
                        Some(slice)
                            if slice.files[0].last_modified == file.last_modified =>
                        {
                            slice.files.push(file);
                        }
                        _ => slices.push(Slice::new(vec![file])),
                    }
                }
                slices
            }
        }
    }

    fn observe_file(&mut self, file: &RemoteFile) {
        self.state.observe(file);
    }

    fn observe_record(&mut self) -> bool {
        self.records_since_checkpoint += 1;
        if self.records_since_checkpoint >= self.checkpoint_interval {
            self.records_since_checkpoint = 0;
            true
        } else {
            false
        }
    }

    fn snapshot(&self) -> Option<JsonValue> {
        Some(serde_json::to_value(&self.state).unwrap_or_default())
    }

    fn progress(&self) -> SyncProgress {
        self.progress
    }

    fn finish(&mut self) {
        self.progress = SyncProgress::Complete;
    }
}

// ============================================================================
// Legacy delegating cursor
// ============================================================================

/// Compatibility shim for streams whose state is checkpointed whole by
/// the caller; snapshots are `None` and every sync is a full pass
#[derive(Debug, Default)]
pub struct LegacyStateCursor {
    progress: SyncProgress,
}

impl LegacyStateCursor {
    /// Create a legacy delegating cursor
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileBasedCursor for LegacyStateCursor {
    fn compute_slices(&mut self, files: Vec<RemoteFile>, _sync_mode: SyncMode) -> Vec<Slice> {
        self.progress = SyncProgress::InProgress;
        if files.is_empty() {
            Vec::new()
        } else {
            vec![Slice::new(files)]
        }
    }

    fn observe_file(&mut self, _file: &RemoteFile) {}

    fn observe_record(&mut self) -> bool {
        false
    }

    fn snapshot(&self) -> Option<JsonValue> {
        None
    }

    fn progress(&self) -> SyncProgress {
        self.progress
    }

    fn finish(&mut self) {
        self.progress = SyncProgress::Complete;
    }
}
