//! Object-store-backed stream reader
//!
//! Lists and opens files through the `object_store` crate, covering S3,
//! GCS, Azure and the local filesystem behind one interface.

use super::{dedup_by_uri, mime_type_for_extension, GlobMatcher, RemoteFile, StreamReader};
use super::types::FileContents;
use crate::error::Result;
use crate::types::FileReadMode;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use std::sync::Arc;

/// Stream reader over any `object_store` backend
#[derive(Clone)]
pub struct ObjectStoreReader {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreReader {
    /// Create a reader over the given store
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Create a reader over a local filesystem directory
    pub fn local(root: impl AsRef<std::path::Path>) -> Result<Self> {
        let store = object_store::local::LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// List one pattern's subtree, filtered down to actual matches
    async fn list_pattern(&self, glob: &GlobMatcher) -> Result<Vec<RemoteFile>> {
        let prefix = match glob.prefix() {
            "" => None,
            p => Some(StorePath::from(p)),
        };

        let metas: Vec<object_store::ObjectMeta> =
            self.store.list(prefix.as_ref()).try_collect().await?;

        let mut files: Vec<RemoteFile> = metas
            .into_iter()
            .filter(|meta| glob.matches(meta.location.as_ref()))
            .map(|meta| {
                let mut file = RemoteFile::new(meta.location.to_string(), meta.last_modified);
                if let Some(mime) = file.extension().and_then(|e| mime_type_for_extension(&e)) {
                    file.mime_type = Some(mime.to_string());
                }
                file
            })
            .collect();

        // Stores generally list lexicographically, but it is not guaranteed
        files.sort_by(|a, b| a.uri.cmp(&b.uri));
        Ok(files)
    }
}

#[async_trait]
impl StreamReader for ObjectStoreReader {
    async fn list_files(&self, globs: &[GlobMatcher]) -> Result<Vec<RemoteFile>> {
        let mut all = Vec::new();
        for glob in globs {
            all.extend(self.list_pattern(glob).await?);
        }
        Ok(dedup_by_uri(all))
    }

    async fn open_file(&self, file: &RemoteFile, mode: FileReadMode) -> Result<FileContents> {
        let path = StorePath::from(file.uri.as_str());
        let bytes = self.store.get(&path).await?.bytes().await?;
        let contents = FileContents::new(&file.uri, bytes);

        if mode == FileReadMode::Text {
            contents.text()?;
        }
        Ok(contents)
    }
}

impl std::fmt::Debug for ObjectStoreReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreReader").finish()
    }
}
