//! File-based stream orchestrator
//!
//! Composes the remote file index, parser registry, discovery policy,
//! cursor and validation policy into one readable stream. The schema is
//! discovered and frozen at construction; reads then pull slices from
//! the cursor, records from the parser, and interleave checkpoint
//! messages so that a consumer persisting only the most recent
//! checkpoint never loses a record it already considered committed.

mod types;


pub use types::{ErrorRecord, ErrorsCollector, Message, ReadStats, SyncPhase};

use crate::config::StreamConfig;
use crate::cursor::{CursorKind, FileBasedCursor, Slice, RECORD_TIMESTAMP_FORMAT};
use crate::discovery::{DiscoveryPolicy, SchemaDiscoverer};
use crate::error::{Error, Result};
use crate::format::{FormatConfig, ParserRegistry};
use crate::remote::{RemoteFile, StreamReader};
use crate::schema::JsonSchema;
use crate::types::{
    JsonObject, JsonValue, SyncMode, SOURCE_FILE_LAST_MODIFIED_FIELD, SOURCE_FILE_URL_FIELD,
};
use crate::validation::ValidationPolicy;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Messages produced by one slice, with the error (if any) that stopped it
///
/// Records emitted before a fatal error are never retracted; the caller
/// forwards `messages` first and then surfaces `error`.
#[derive(Debug)]
pub struct SliceOutput {
    /// Messages in emission order
    pub messages: Vec<Message>,
    /// Fatal error that ended the slice early
    pub error: Option<Error>,
}

/// A readable file-based stream with a frozen schema
pub struct FileBasedStream {
    config: StreamConfig,
    reader: Arc<dyn StreamReader>,
    registry: Arc<ParserRegistry>,
    policy: DiscoveryPolicy,
    validation: ValidationPolicy,
    schema: JsonSchema,
    cursor: Box<dyn FileBasedCursor>,
    phase: SyncPhase,
    errors: ErrorsCollector,
    stats: ReadStats,
}

impl FileBasedStream {
    /// Construct a stream: validate config, resolve the parser, discover
    /// and freeze the schema, and build the cursor from prior state
    ///
    /// Configuration problems (malformed glob, missing validation
    /// policy, invalid prior state) fail here, never lazily mid-sync.
    pub async fn create(
        config: StreamConfig,
        reader: Arc<dyn StreamReader>,
        registry: Arc<ParserRegistry>,
        policy: DiscoveryPolicy,
        cursor_kind: CursorKind,
        prior_state: Option<&JsonValue>,
    ) -> Result<Self> {
        config.validate()?;
        let validation = effective_validation_policy(&config)?;

        let schema = SchemaDiscoverer::new(reader.as_ref(), registry.as_ref(), policy)
            .discover_schema(&config)
            .await?;

        let cursor = cursor_kind.build(config.state_checkpoint_interval, prior_state)?;

        Ok(Self {
            config,
            reader,
            registry,
            policy,
            validation,
            schema,
            cursor,
            phase: SyncPhase::Idle,
            errors: ErrorsCollector::new(),
            stats: ReadStats::default(),
        })
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The frozen stream schema
    pub fn get_json_schema(&self) -> &JsonSchema {
        &self.schema
    }

    /// Snapshot of the current cursor state
    ///
    /// `None` defers to legacy whole-state checkpointing by the caller.
    pub fn get_cursor(&self) -> Option<JsonValue> {
        self.cursor.snapshot()
    }

    /// Current orchestrator phase
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Read-side counters
    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    /// Errors collected from skipped files
    pub fn errors(&self) -> &ErrorsCollector {
        &self.errors
    }

    /// List the stream's files and partition them into slices
    pub async fn compute_slices(&mut self, sync_mode: SyncMode) -> Result<Vec<Slice>> {
        self.phase = SyncPhase::Slicing;
        let discoverer =
            SchemaDiscoverer::new(self.reader.as_ref(), self.registry.as_ref(), self.policy);
        let files = discoverer.list_matching_files(&self.config).await?;
        Ok(self.cursor.compute_slices(files, sync_mode))
    }

    /// Read every file in a slice, producing records interleaved with
    /// checkpoint messages
    ///
    /// Per-file failures are isolated when the stream allows skipping
    /// unprocessable files; otherwise the first failure ends the slice
    /// with `error` set and the stream transitions to `Failed`. A
    /// checkpoint is always emitted at the end of a completed slice.
    pub async fn read_records_from_slice(&mut self, slice: &Slice) -> SliceOutput {
        let mut messages = Vec::new();

        for file in &slice.files {
            self.phase = SyncPhase::ReadingFile;
            match self.read_file(file, &mut messages).await {
                Ok(()) => {
                    self.cursor.observe_file(file);
                    self.stats.files_processed += 1;
                }
                Err(e) if self.can_skip_file(&e) => {
                    warn!(
                        stream = %self.config.name,
                        file = %file.uri,
                        "skipping unprocessable file: {e}"
                    );
                    messages.push(Message::warn(format!(
                        "File {} skipped: {e}",
                        file.uri
                    )));
                    self.errors.collect(&file.uri, &e);
                    self.cursor.observe_file(file);
                    self.stats.files_skipped += 1;
                }
                Err(e) => {
                    self.phase = SyncPhase::Failed;
                    return SliceOutput {
                        messages,
                        error: Some(e),
                    };
                }
            }
        }

        // Slice boundary: checkpoint unconditionally
        self.checkpoint_into(&mut messages);
        SliceOutput {
            messages,
            error: None,
        }
    }

    /// Emit the final checkpoint and mark the stream done
    ///
    /// Called after the last slice; also the whole read for a stream
    /// whose file set produced no slices, so a no-op sync still ends in
    /// a resumable, never-regressed state.
    pub fn finalize(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        self.checkpoint_into(&mut messages);
        self.cursor.finish();
        self.phase = SyncPhase::Done;
        info!(
            stream = %self.config.name,
            records = self.stats.records_emitted,
            skipped = self.stats.records_skipped,
            files = self.stats.files_processed,
            "stream read complete"
        );
        messages
    }

    /// Drive the whole read: slices, records, final checkpoint
    ///
    /// Messages already emitted before a fatal error are preserved ahead
    /// of the error item.
    pub async fn read_to_end(&mut self, sync_mode: SyncMode) -> Vec<Result<Message>> {
        let slices = match self.compute_slices(sync_mode).await {
            Ok(slices) => slices,
            Err(e) => {
                self.phase = SyncPhase::Failed;
                return vec![Err(e)];
            }
        };

        let mut out: Vec<Result<Message>> = Vec::new();
        for slice in &slices {
            let SliceOutput { messages, error } = self.read_records_from_slice(slice).await;
            out.extend(messages.into_iter().map(Ok));
            if let Some(e) = error {
                out.push(Err(e));
                return out;
            }
        }

        out.extend(self.finalize().into_iter().map(Ok));
        out
    }

    /// Read one file's records into `messages`
    async fn read_file(&mut self, file: &RemoteFile, messages: &mut Vec<Message>) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let parser = registry.resolve(&self.config.format);
        let records = parser
            .parse_records(&self.config, file, self.reader.as_ref())
            .await?;

        let mut n_skipped = 0_usize;
        for item in records {
            let record = item?;

            if !self
                .validation
                .record_passes_validation_policy(&record, &self.schema)
            {
                self.stats.records_skipped += 1;
                n_skipped += 1;
                if self.validation == ValidationPolicy::WaitForDiscover {
                    warn!(
                        stream = %self.config.name,
                        file = %file.uri,
                        "stopping file on schema mismatch; a re-discover is needed"
                    );
                    break;
                }
                continue;
            }

            messages.push(Message::record(
                &self.config.name,
                enrich_record(record, file),
            ));
            self.stats.records_emitted += 1;

            if self.cursor.observe_record() {
                self.checkpoint_into(messages);
            }
        }

        if n_skipped > 0 {
            let line = format!(
                "Records in file did not pass validation policy. stream={} file={} n_skipped={} validation_policy={}",
                self.config.name,
                file.uri,
                n_skipped,
                self.validation.name()
            );
            warn!("{line}");
            messages.push(Message::warn(line));
        }

        Ok(())
    }

    /// Push a checkpoint message unless the cursor defers to legacy
    /// whole-state checkpointing
    fn checkpoint_into(&mut self, messages: &mut Vec<Message>) {
        self.phase = SyncPhase::Checkpointing;
        if let Some(state) = self.cursor.snapshot() {
            messages.push(Message::state(&self.config.name, state));
            self.stats.checkpoints_emitted += 1;
        }
    }

    /// Whether a per-file error may be skipped instead of failing the sync
    fn can_skip_file(&self, error: &Error) -> bool {
        self.config.skips_unprocessable_files()
            && matches!(
                error,
                Error::RecordParse { .. } | Error::SchemaInference { .. }
            )
    }
}

/// Resolve the stream's validation policy, failing fast when a stream
/// that needs one has none configured
///
/// Schemaless and unstructured streams have nothing meaningful to
/// validate against, so they default to emitting every record.
fn effective_validation_policy(config: &StreamConfig) -> Result<ValidationPolicy> {
    match config.validation_policy {
        Some(policy) => Ok(policy),
        None if config.schemaless || matches!(config.format, FormatConfig::Unstructured(_)) => {
            Ok(ValidationPolicy::EmitRecord)
        }
        None => Err(Error::UndefinedValidationPolicy {
            stream: config.name.clone(),
        }),
    }
}

/// Append the source-file metadata fields to a record
fn enrich_record(mut record: JsonObject, file: &RemoteFile) -> JsonObject {
    record.insert(
        SOURCE_FILE_URL_FIELD.to_string(),
        Value::String(file.uri.clone()),
    );
    record.insert(
        SOURCE_FILE_LAST_MODIFIED_FIELD.to_string(),
        Value::String(file.last_modified.format(RECORD_TIMESTAMP_FORMAT).to_string()),
    );
    record
}
