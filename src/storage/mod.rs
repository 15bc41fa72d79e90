//! Blob store adapter for the ledger container.
//!
//! Wraps an `object_store` backend behind the small capability set the
//! ledger needs: existence check, whole-object read and overwrite-write,
//! staged append, delete, and prefix listing. Cloud construction lives in
//! `azure`; tests and local runs inject their own backend via `with_store`.

mod azure;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use snafu::prelude::*;
use snafu::IntoError;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ObjectStoreSnafu, StagedAppendSnafu, StorageError};

/// Blob store adapter over a single container.
///
/// All operations address whole objects. `append` is a staged
/// read-modify-write, not a streaming append, so each call costs a full
/// read of the existing object.
#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
    label: String,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlobStore<{}>", self.label)
    }
}

impl BlobStore {
    /// Wrap an existing object store (local filesystem, in-memory).
    pub fn with_store(store: Arc<dyn ObjectStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }

    /// Callers sometimes hand in slash-rooted container paths; strip the
    /// leading slashes rather than creating an empty first segment.
    fn path(location: &str) -> Path {
        Path::from(location.trim_start_matches('/'))
    }

    /// Check whether the object at `location` exists.
    ///
    /// Only "not found" maps to `false`; any other failure surfaces.
    pub async fn exists(&self, location: &str) -> Result<bool, StorageError> {
        match self.store.head(&Self::path(location)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(source) => Err(StorageError::ObjectStore { source }),
        }
    }

    /// Read the full content of the object at `location`.
    pub async fn read(&self, location: &str) -> Result<Bytes, StorageError> {
        let result = self
            .store
            .get(&Self::path(location))
            .await
            .context(ObjectStoreSnafu)?;
        result.bytes().await.context(ObjectStoreSnafu)
    }

    /// Write `content` to `location`, overwriting any existing object.
    pub async fn write(&self, location: &str, content: Bytes) -> Result<(), StorageError> {
        self.store
            .put(&Self::path(location), PutPayload::from(content))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Append `content` to the object at `location`, creating it if absent.
    ///
    /// Reads the existing content, concatenates, stages the combined bytes
    /// at `{location}.tmp`, then renames over the target. On any failure the
    /// target keeps its prior content and the staging object is removed.
    pub async fn append(&self, location: &str, content: Bytes) -> Result<(), StorageError> {
        let target = Self::path(location);
        let existing = match self.store.get(&target).await {
            Ok(result) => result.bytes().await.context(ObjectStoreSnafu)?,
            Err(object_store::Error::NotFound { .. }) => Bytes::new(),
            Err(source) => return Err(StorageError::ObjectStore { source }),
        };

        let mut combined = Vec::with_capacity(existing.len() + content.len());
        combined.extend_from_slice(&existing);
        combined.extend_from_slice(&content);

        let staging = Path::from(format!("{target}.tmp"));
        if let Err(source) = self
            .store
            .put(&staging, PutPayload::from(Bytes::from(combined)))
            .await
        {
            self.discard_staging(&staging).await;
            return Err(StagedAppendSnafu { location }.into_error(source));
        }

        if let Err(source) = self.store.rename(&staging, &target).await {
            self.discard_staging(&staging).await;
            return Err(StagedAppendSnafu { location }.into_error(source));
        }

        Ok(())
    }

    /// Best-effort removal of a staging object after a failed append.
    async fn discard_staging(&self, staging: &Path) {
        match self.store.delete(staging).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
            Err(err) => warn!("Failed to remove staging object {staging}: {err}"),
        }
    }

    /// Delete the object at `location`.
    pub async fn remove(&self, location: &str) -> Result<(), StorageError> {
        self.store
            .delete(&Self::path(location))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// List object names starting with `prefix`.
    ///
    /// Order is backend-defined. `object_store` prefixes are segment
    /// aligned, so the listing walks the parent directory and filters for
    /// plain string-prefix semantics.
    pub fn list_names<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Stream<Item = Result<String, StorageError>> + 'a {
        let needle = prefix.trim_start_matches('/').to_string();
        let parent = needle.rsplit_once('/').map(|(dir, _)| Path::from(dir));

        self.store
            .list(parent.as_ref())
            .map(|entry| match entry {
                Ok(meta) => Ok(meta.location.to_string()),
                Err(source) => Err(StorageError::ObjectStore { source }),
            })
            .filter(move |entry| {
                let keep = match entry {
                    Ok(name) => name.starts_with(&needle),
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
    }
}
