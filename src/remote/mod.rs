//! Remote file index
//!
//! The source-of-truth store is abstracted behind the [`StreamReader`]
//! trait: list files matching glob patterns, open one file at a time.
//! Listings are finite and not restartable; a fresh call re-enumerates.
//!
//! Two implementations ship with the CDK: [`ObjectStoreReader`] for cloud
//! and local stores via `object_store`, and [`InMemoryStreamReader`] for
//! tests.

mod glob;
mod memory;
mod store;
mod types;


pub use glob::GlobMatcher;
pub use memory::InMemoryStreamReader;
pub use store::ObjectStoreReader;
pub use types::{FileContents, RemoteFile};

use crate::error::Result;
use crate::types::FileReadMode;
use async_trait::async_trait;

/// Contract for listing and opening files in the source store
///
/// Connectivity failures surface as errors from these calls; the
/// orchestrator treats them as fatal for the file in question.
#[async_trait]
pub trait StreamReader: Send + Sync {
    /// List all files matching any of the given glob patterns
    ///
    /// Returned in listing order (provider-determined, typically
    /// lexicographic by URI); de-duplicated across overlapping patterns.
    async fn list_files(&self, globs: &[GlobMatcher]) -> Result<Vec<RemoteFile>>;

    /// Open a file and read its contents
    ///
    /// `Text` mode validates the contents decode as UTF-8 before
    /// returning; `Binary` returns raw bytes.
    async fn open_file(&self, file: &RemoteFile, mode: FileReadMode) -> Result<FileContents>;
}

/// Keep the first occurrence of each URI, preserving listing order
pub(crate) fn dedup_by_uri(files: Vec<RemoteFile>) -> Vec<RemoteFile> {
    let mut seen = std::collections::HashSet::new();
    files
        .into_iter()
        .filter(|f| seen.insert(f.uri.clone()))
        .collect()
}

/// Guess a MIME type from a file extension
pub(crate) fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "csv" => Some("text/csv"),
        "jsonl" | "ndjson" => Some("application/x-ndjson"),
        "json" => Some("application/json"),
        "parquet" => Some("application/vnd.apache.parquet"),
        "md" => Some("text/markdown"),
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        "pptx" => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        _ => None,
    }
}
