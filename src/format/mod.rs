//! File format parsers
//!
//! One parser per supported file format, behind the [`FileTypeParser`]
//! capability trait: schema inference, lazy record parsing, and a cheap
//! config probe for connection checks. The [`ParserRegistry`] is built
//! once at startup and resolved once per stream at construction; the
//! format enum is closed, so dispatch is a match, not a lookup table.

mod csv;
mod jsonl;
mod parquet;
mod types;
mod unstructured;

#[cfg(test)]
mod tests;

pub use csv::CsvParser;
pub use jsonl::JsonlParser;
// self:: disambiguates the module from the parquet crate
pub use self::parquet::ParquetParser;
pub use types::{
    ApiParameter, CsvFormat, CsvHeaderDefinition, FormatConfig, JsonlFormat, ParquetFormat,
    ProcessingConfig, UnstructuredFormat,
};
pub use unstructured::UnstructuredParser;

use crate::config::StreamConfig;
use crate::error::Result;
use crate::remote::{RemoteFile, StreamReader};
use crate::schema::JsonSchema;
use crate::types::JsonObject;
use async_trait::async_trait;

/// Lazy, finite, non-restartable sequence of parsed records
pub type RecordIterator = Box<dyn Iterator<Item = Result<JsonObject>> + Send>;

/// Capability exposed by every file format parser
#[async_trait]
pub trait FileTypeParser: Send + Sync {
    /// How many files are enough to trust the inferred schema
    ///
    /// 1 for formats whose structure is static per file set; more for
    /// formats whose schema may vary file to file.
    fn max_n_files_for_schema_inference(&self) -> usize;

    /// How many files to probe at connection-check time before declaring
    /// the stream readable; 0 when probing is expensive or low-value
    fn max_n_files_for_parsability(&self) -> usize;

    /// Cheap validity/connectivity probe, distinct from a full parse
    async fn check_config(&self, config: &StreamConfig) -> (bool, Option<String>);

    /// Infer a per-file schema, reading only as much as needed
    ///
    /// Fails with a schema inference error if the file is unreadable or
    /// not of the declared type; the caller decides whether to skip or
    /// abort based on the stream's policy.
    async fn infer_schema(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<JsonSchema>;

    /// Parse a file into a lazy sequence of records
    ///
    /// Iterator items fail with a record parse error carrying the file
    /// URI; the orchestrator either aborts or skips per the stream
    /// config.
    async fn parse_records(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordIterator>;
}

/// Registry of the parsers for every supported format
///
/// Built once per process; streams resolve their parser at construction
/// and keep the reference for the whole sync.
#[derive(Default)]
pub struct ParserRegistry {
    csv: CsvParser,
    jsonl: JsonlParser,
    parquet: ParquetParser,
    unstructured: UnstructuredParser,
}

impl ParserRegistry {
    /// Create a registry with all built-in parsers
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the parser for a stream's declared format
    pub fn resolve(&self, format: &FormatConfig) -> &dyn FileTypeParser {
        match format {
            FormatConfig::Csv(_) => &self.csv,
            FormatConfig::Jsonl(_) => &self.jsonl,
            FormatConfig::Parquet(_) => &self.parquet,
            FormatConfig::Unstructured(_) => &self.unstructured,
        }
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry").finish()
    }
}
