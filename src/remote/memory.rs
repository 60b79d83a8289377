//! In-memory stream reader for tests
//!
//! Seed it with (uri, contents, last_modified) triples and hand it to a
//! stream in place of a real store. Counts `open_file` calls so tests can
//! assert on discovery sampling bounds.

use super::types::FileContents;
use super::{dedup_by_uri, GlobMatcher, RemoteFile, StreamReader};
use crate::error::{Error, Result};
use crate::types::FileReadMode;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A seeded, in-memory file store
#[derive(Debug, Default)]
pub struct InMemoryStreamReader {
    // BTreeMap keeps listing order lexicographic, matching real stores
    files: BTreeMap<String, (Bytes, DateTime<Utc>)>,
    opens: AtomicUsize,
}

impl InMemoryStreamReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the given contents and last-modified timestamp
    #[must_use]
    pub fn with_file(
        mut self,
        uri: impl Into<String>,
        contents: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        self.files
            .insert(uri.into(), (contents.into(), last_modified));
        self
    }

    /// Number of `open_file` calls made so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamReader for InMemoryStreamReader {
    async fn list_files(&self, globs: &[GlobMatcher]) -> Result<Vec<RemoteFile>> {
        let mut all = Vec::new();
        for glob in globs {
            for (uri, (_, last_modified)) in &self.files {
                if glob.matches(uri) {
                    all.push(RemoteFile::new(uri.clone(), *last_modified));
                }
            }
        }
        Ok(dedup_by_uri(all))
    }

    async fn open_file(&self, file: &RemoteFile, mode: FileReadMode) -> Result<FileContents> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (bytes, _) = self.files.get(&file.uri).ok_or_else(|| Error::FileNotFound {
            uri: file.uri.clone(),
        })?;

        let contents = FileContents::new(&file.uri, bytes.clone());
        if mode == FileReadMode::Text {
            contents.text()?;
        }
        Ok(contents)
    }
}
