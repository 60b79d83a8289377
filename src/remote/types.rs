//! Remote file handle types

use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lightweight handle to a file in the source store
///
/// Produced by a listing call; re-derived on every sync, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// URI of the file, unique within a stream
    pub uri: String,

    /// Last-modified timestamp reported by the store
    pub last_modified: DateTime<Utc>,

    /// MIME type, if the store reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl RemoteFile {
    /// Create a new remote file handle
    pub fn new(uri: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            uri: uri.into(),
            last_modified,
            mime_type: None,
        }
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// The file's extension (lowercased), if any
    pub fn extension(&self) -> Option<String> {
        self.uri
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && !ext.contains('/'))
    }
}

/// Contents of an opened remote file
///
/// A scoped resource: the backing buffer is released when this is dropped.
#[derive(Debug, Clone)]
pub struct FileContents {
    uri: String,
    bytes: Bytes,
}

impl FileContents {
    /// Wrap raw bytes read from a file
    pub fn new(uri: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            uri: uri.into(),
            bytes,
        }
    }

    /// URI of the file these contents came from
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Raw bytes
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Take ownership of the raw bytes
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Decode the contents as UTF-8 text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| Error::record_parse(&self.uri, format!("invalid UTF-8: {e}")))
    }

    /// Decode and take ownership of the contents as UTF-8 text
    pub fn into_text(self) -> Result<String> {
        String::from_utf8(self.bytes.to_vec())
            .map_err(|e| Error::record_parse(&self.uri, format!("invalid UTF-8: {e}")))
    }

    /// Size of the contents in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_extension() {
        let file = RemoteFile::new("data/2024/records.csv", Utc::now());
        assert_eq!(file.extension(), Some("csv".to_string()));

        let file = RemoteFile::new("data/2024/ARCHIVE.PDF", Utc::now());
        assert_eq!(file.extension(), Some("pdf".to_string()));

        let file = RemoteFile::new("no_extension", Utc::now());
        assert_eq!(file.extension(), None);

        let file = RemoteFile::new("dir.with.dots/file", Utc::now());
        assert_eq!(file.extension(), None);
    }

    #[test]
    fn test_file_contents_text() {
        let contents = FileContents::new("a.txt", Bytes::from_static(b"hello"));
        assert_eq!(contents.text().unwrap(), "hello");
        assert_eq!(contents.len(), 5);

        let contents = FileContents::new("a.bin", Bytes::from_static(&[0xff, 0xfe]));
        assert!(contents.text().is_err());
    }
}
