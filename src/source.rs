//! File-based source facade
//!
//! The connector-protocol surface over the file-based core: `spec`,
//! `check`, `discover` and `read`. A source owns one stream reader, one
//! parser registry and one discovery policy, shared read-only by every
//! stream it constructs.

use crate::config::{SourceConfig, StreamConfig};
use crate::cursor::CursorKind;
use crate::discovery::{DiscoveryPolicy, SchemaDiscoverer};
use crate::error::{Error, Result};
use crate::format::ParserRegistry;
use crate::remote::StreamReader;
use crate::stream::{FileBasedStream, Message, SliceOutput};
use crate::types::{JsonValue, SyncMode, SOURCE_FILE_LAST_MODIFIED_FIELD};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Protocol types
// ============================================================================

/// Source specification returned by `spec()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Documentation URL
    pub documentation_url: String,

    /// JSON schema of the source configuration
    pub connection_specification: JsonValue,
}

/// Result of a connection check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Catalog of discoverable streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Discovered streams
    pub streams: Vec<CatalogStream>,
}

/// One discovered stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStream {
    /// Stream name
    pub name: String,

    /// Inferred JSON schema
    pub json_schema: JsonValue,

    /// Sync modes this stream supports
    pub supported_sync_modes: Vec<SyncMode>,

    /// Cursor field the source defines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cursor_field: Option<Vec<String>>,

    /// Whether the cursor is defined by the source
    pub source_defined_cursor: bool,

    /// Primary key the source defines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_defined_primary_key: Option<Vec<Vec<String>>>,
}

/// Streams selected for a read, with their sync modes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    /// Selected streams
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    /// Select every stream of a catalog with the given sync mode
    pub fn select_all(catalog: &Catalog, sync_mode: SyncMode) -> Self {
        Self {
            streams: catalog
                .streams
                .iter()
                .map(|s| ConfiguredStream {
                    stream: s.name.clone(),
                    sync_mode,
                })
                .collect(),
        }
    }
}

/// One selected stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredStream {
    /// Stream name
    pub stream: String,

    /// Sync mode to read with
    #[serde(default)]
    pub sync_mode: SyncMode,
}

/// Type alias for the message stream returned by `read()`
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

// ============================================================================
// Source trait
// ============================================================================

/// Core protocol surface every source implements
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the source specification (for UI/validation)
    fn spec(&self) -> SourceSpec;

    /// Tests that every configured stream is readable
    async fn check(&self) -> Result<CheckResult>;

    /// Discovers streams and their schemas
    async fn discover(&self) -> Result<Catalog>;

    /// Reads the selected streams, producing records, checkpoints and logs
    async fn read(
        &self,
        catalog: &ConfiguredCatalog,
        state: Option<&JsonValue>,
    ) -> Result<MessageStream>;
}

// ============================================================================
// File-based source
// ============================================================================

/// A source reading file-based streams from one store
pub struct FileBasedSource {
    config: SourceConfig,
    reader: Arc<dyn StreamReader>,
    registry: Arc<ParserRegistry>,
    policy: DiscoveryPolicy,
}

impl FileBasedSource {
    /// Create a source over the given reader
    pub fn new(config: SourceConfig, reader: Arc<dyn StreamReader>) -> Self {
        Self {
            config,
            reader,
            registry: Arc::new(ParserRegistry::new()),
            policy: DiscoveryPolicy::default(),
        }
    }

    /// Override the discovery policy
    #[must_use]
    pub fn with_policy(mut self, policy: DiscoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check one stream: config probe, listing, bounded parsability probe
    async fn check_stream(&self, stream: &StreamConfig) -> Result<()> {
        stream.validate()?;
        let parser = self.registry.resolve(&stream.format);

        let (ok, error) = parser.check_config(stream).await;
        if !ok {
            return Err(Error::check(error.unwrap_or_else(|| "invalid format config".into())));
        }

        let discoverer =
            SchemaDiscoverer::new(self.reader.as_ref(), self.registry.as_ref(), self.policy);
        let files = discoverer.list_matching_files(stream).await?;
        if files.is_empty() {
            return Err(Error::check(format!(
                "stream '{}' matched no files; check its glob patterns",
                stream.name
            )));
        }

        // Probe up to the parser's advertised parsability bound
        for file in files.iter().take(parser.max_n_files_for_parsability()) {
            parser
                .infer_schema(stream, file, self.reader.as_ref())
                .await?;
        }
        Ok(())
    }

    /// Build a readable stream from its config and prior state
    async fn open_stream(
        &self,
        config: StreamConfig,
        prior_state: Option<&JsonValue>,
    ) -> Result<FileBasedStream> {
        FileBasedStream::create(
            config,
            Arc::clone(&self.reader),
            Arc::clone(&self.registry),
            self.policy,
            CursorKind::SelfManaged,
            prior_state,
        )
        .await
    }
}

#[async_trait]
impl Source for FileBasedSource {
    fn spec(&self) -> SourceSpec {
        SourceSpec {
            documentation_url: "https://docs.filesource.dev/sources/files".to_string(),
            connection_specification: config_specification(),
        }
    }

    async fn check(&self) -> Result<CheckResult> {
        let mut failures = Vec::new();
        for stream in &self.config.streams {
            if let Err(e) = self.check_stream(stream).await {
                failures.push(format!("{}: {e}", stream.name));
            }
        }

        if failures.is_empty() {
            Ok(CheckResult::success())
        } else {
            Ok(CheckResult::failure(failures.join("; ")))
        }
    }

    async fn discover(&self) -> Result<Catalog> {
        let discoverer =
            SchemaDiscoverer::new(self.reader.as_ref(), self.registry.as_ref(), self.policy);

        let mut streams = Vec::new();
        for stream in &self.config.streams {
            let schema = discoverer.discover_schema(stream).await?;
            streams.push(CatalogStream {
                name: stream.name.clone(),
                json_schema: schema.to_json(),
                supported_sync_modes: vec![SyncMode::FullRefresh, SyncMode::Incremental],
                default_cursor_field: Some(vec![SOURCE_FILE_LAST_MODIFIED_FIELD.to_string()]),
                source_defined_cursor: true,
                source_defined_primary_key: stream.primary_key.as_ref().map(|pk| {
                    pk.fields().iter().map(|f| vec![(*f).to_string()]).collect()
                }),
            });
        }

        Ok(Catalog { streams })
    }

    async fn read(
        &self,
        catalog: &ConfiguredCatalog,
        state: Option<&JsonValue>,
    ) -> Result<MessageStream> {
        let mut drivers = VecDeque::new();
        for configured in &catalog.streams {
            let stream_config = self
                .config
                .get_stream(&configured.stream)
                .ok_or_else(|| Error::StreamNotFound {
                    stream: configured.stream.clone(),
                })?
                .clone();

            let prior = state.and_then(|s| s.get(&configured.stream)).cloned();
            let stream = self.open_stream(stream_config, prior.as_ref()).await?;
            info!(stream = %configured.stream, mode = ?configured.sync_mode, "starting read");

            drivers.push_back(StreamDriver {
                stream,
                sync_mode: configured.sync_mode,
                slices: None,
            });
        }

        // Streams are driven one slice at a time; the consumer stopping
        // mid-stream leaves no unflushed side effects behind
        let messages = futures::stream::unfold(drivers, drive_next).flat_map(futures::stream::iter);
        Ok(Box::pin(messages))
    }
}

/// Per-stream read progress inside a `read()` call
struct StreamDriver {
    stream: FileBasedStream,
    sync_mode: SyncMode,
    slices: Option<VecDeque<crate::cursor::Slice>>,
}

/// Produce the next batch of messages, advancing one slice of one stream
async fn drive_next(
    mut drivers: VecDeque<StreamDriver>,
) -> Option<(Vec<Result<Message>>, VecDeque<StreamDriver>)> {
    let mut driver = drivers.pop_front()?;

    if driver.slices.is_none() {
        match driver.stream.compute_slices(driver.sync_mode).await {
            Ok(slices) => driver.slices = Some(slices.into()),
            // A stream whose discovery-time listing fails is aborted;
            // the remaining streams still read
            Err(e) => return Some((vec![Err(e)], drivers)),
        }
    }

    match driver.slices.as_mut().and_then(VecDeque::pop_front) {
        Some(slice) => {
            let SliceOutput { messages, error } = driver.stream.read_records_from_slice(&slice).await;
            let mut out: Vec<Result<Message>> = messages.into_iter().map(Ok).collect();
            match error {
                Some(e) => out.push(Err(e)),
                None => drivers.push_front(driver),
            }
            Some((out, drivers))
        }
        None => {
            let out = driver.stream.finalize().into_iter().map(Ok).collect();
            Some((out, drivers))
        }
    }
}

/// JSON schema of the source configuration, shown by `spec()`
fn config_specification() -> JsonValue {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "File-based Source Spec",
        "type": "object",
        "required": ["streams"],
        "properties": {
            "streams": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "globs", "format"],
                    "properties": {
                        "name": {"type": "string"},
                        "globs": {"type": "array", "items": {"type": "string"}},
                        "format": {"type": "object"},
                        "validation_policy": {
                            "type": "string",
                            "enum": ["emit_record", "skip_record", "wait_for_discover"]
                        },
                        "primary_key": {},
                        "schemaless": {"type": "boolean", "default": false},
                        "input_schema": {"type": "object"},
                        "state_checkpoint_interval": {
                            "type": "integer",
                            "minimum": 1,
                            "default": 1000
                        }
                    }
                }
            }
        }
    })
}
