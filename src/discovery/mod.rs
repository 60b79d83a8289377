//! Schema discovery
//!
//! Samples a bounded number of files from the stream's listing, infers a
//! per-file schema via the stream's parser, and merges the results into
//! one canonical stream schema. Sampling reads files with bounded
//! concurrency, but merging happens in listing order so the result is
//! deterministic.

mod policy;

#[cfg(test)]
mod tests;

pub use policy::DiscoveryPolicy;

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::format::ParserRegistry;
use crate::remote::{GlobMatcher, RemoteFile, StreamReader};
use crate::schema::{merge_schemas, JsonSchema, JsonType, SchemaProperty};
use crate::types::{SOURCE_FILE_LAST_MODIFIED_FIELD, SOURCE_FILE_URL_FIELD};
use futures::StreamExt;
use tracing::{debug, warn};

/// Discovers the schema for file-based streams
pub struct SchemaDiscoverer<'a> {
    reader: &'a dyn StreamReader,
    registry: &'a ParserRegistry,
    policy: DiscoveryPolicy,
}

impl<'a> SchemaDiscoverer<'a> {
    /// Create a discoverer over the given reader and registry
    pub fn new(
        reader: &'a dyn StreamReader,
        registry: &'a ParserRegistry,
        policy: DiscoveryPolicy,
    ) -> Self {
        Self {
            reader,
            registry,
            policy,
        }
    }

    /// List a stream's files, enforcing the enumeration cap
    pub async fn list_matching_files(&self, config: &StreamConfig) -> Result<Vec<RemoteFile>> {
        let globs = GlobMatcher::compile_all(&config.globs)?;
        let files = self.reader.list_files(&globs).await?;
        if files.len() > self.policy.max_files_to_enumerate() {
            return Err(Error::TooManyFiles {
                matched: files.len(),
                limit: self.policy.max_files_to_enumerate(),
            });
        }
        Ok(files)
    }

    /// Infer the stream's schema, frozen for the rest of the sync
    ///
    /// A user-provided schema bypasses sampling entirely; a schemaless
    /// stream gets a single object-typed `data` field. Otherwise the
    /// first `min(files, parser limit, policy limit)` files are sampled
    /// and merged. A sampled file that cannot be parsed aborts discovery
    /// unless the stream allows skipping unprocessable files.
    pub async fn discover_schema(&self, config: &StreamConfig) -> Result<JsonSchema> {
        let mut schema = self.base_schema(config).await?;

        // Every record carries its source file metadata
        schema.add_property(
            SOURCE_FILE_URL_FIELD,
            SchemaProperty::new(JsonType::String),
        );
        schema.add_property(
            SOURCE_FILE_LAST_MODIFIED_FIELD,
            SchemaProperty::new(JsonType::String).with_format("date-time"),
        );
        Ok(schema)
    }

    async fn base_schema(&self, config: &StreamConfig) -> Result<JsonSchema> {
        if let Some(input_schema) = &config.input_schema {
            return Ok(input_schema.clone());
        }
        if config.schemaless {
            let mut schema = JsonSchema::new();
            schema.add_property("data", SchemaProperty::new(JsonType::Object));
            return Ok(schema);
        }

        let parser = self.registry.resolve(&config.format);
        let files = self.list_matching_files(config).await?;
        if files.is_empty() {
            return Err(Error::config(format!(
                "stream '{}' matched no files; check its glob patterns",
                config.name
            )));
        }

        let n_to_sample = self
            .policy
            .n_files_to_sample(parser.max_n_files_for_schema_inference())
            .min(files.len());
        let sample = &files[..n_to_sample];
        debug!(
            stream = %config.name,
            sampled = n_to_sample,
            matched = files.len(),
            "inferring schema"
        );

        // Bounded concurrency; buffered() keeps completion in listing
        // order so the merge is deterministic
        let mut tasks = Vec::with_capacity(sample.len());
        for file in sample {
            let file = file.clone();
            tasks.push(async move {
                let result = parser.infer_schema(config, &file, self.reader).await;
                (file.uri.clone(), result)
            });
        }
        let inferred: Vec<(String, Result<JsonSchema>)> = futures::stream::iter(tasks)
            .buffered(self.policy.max_concurrent_file_reads())
            .collect()
            .await;

        let mut merged: Option<JsonSchema> = None;
        for (uri, result) in inferred {
            match result {
                Ok(schema) => {
                    merged = Some(match merged {
                        Some(prev) => merge_schemas(&prev, &schema),
                        None => schema,
                    });
                }
                Err(e) if config.skips_unprocessable_files() => {
                    warn!(file = %uri, "skipping unparsable file during discovery: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        merged.ok_or_else(|| {
            Error::config(format!(
                "stream '{}': no sampled file could be parsed",
                config.name
            ))
        })
    }
}
