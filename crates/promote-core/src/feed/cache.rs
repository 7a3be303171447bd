use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use promote_schema::{PackageId, PackageIdentity, PackageMetadata, PackageVersion};
use tokio::io::AsyncWrite;

use super::{ArchiveReader, Feed, FeedError};

/// A [`Feed`] decorator that memoizes version lists.
///
/// Meant to live for exactly one resolution run. Lookups are
/// case-insensitive on the package id (through [`PackageId`]'s equality),
/// and failures are never cached so a later lookup retries the feed. The
/// lock is never held across an await point.
pub struct CachingFeed<'a> {
    inner: &'a dyn Feed,
    versions: Mutex<HashMap<PackageId, Vec<PackageVersion>>>,
}

impl<'a> CachingFeed<'a> {
    pub fn new(inner: &'a dyn Feed) -> Self {
        Self {
            inner,
            versions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of package ids with a cached version list.
    pub fn cached_len(&self) -> usize {
        self.versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, id: &PackageId) -> Option<Vec<PackageVersion>> {
        self.versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl Feed for CachingFeed<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn all_versions(&self, id: &PackageId) -> Result<Vec<PackageVersion>, FeedError> {
        if let Some(versions) = self.cached(id) {
            tracing::trace!("Version cache hit for {}", id);
            return Ok(versions);
        }

        let versions = self.inner.all_versions(id).await?;
        self.versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), versions.clone());
        Ok(versions)
    }

    async fn metadata(&self, identity: &PackageIdentity) -> Result<PackageMetadata, FeedError> {
        self.inner.metadata(identity).await
    }

    async fn exists(&self, identity: &PackageIdentity) -> Result<bool, FeedError> {
        self.inner.exists(identity).await
    }

    async fn copy_archive(
        &self,
        identity: &PackageIdentity,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), FeedError> {
        self.inner.copy_archive(identity, dest).await
    }

    async fn push_archive(&self, path: &Path, skip_duplicate: bool) -> Result<(), FeedError> {
        self.inner.push_archive(path, skip_duplicate).await
    }

    async fn open_archive(&self, identity: &PackageIdentity) -> Result<ArchiveReader, FeedError> {
        self.inner.open_archive(identity).await
    }
}
