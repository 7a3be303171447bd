//! Package feed access.
//!
//! A [`Feed`] is everything the core needs from a package repository. The
//! source and destination of a promotion run each get one. [`NuGetFeed`]
//! talks to a NuGet v3 server; [`CachingFeed`] memoizes version lists for the
//! duration of one resolution run.

pub mod cache;
pub mod nuget;

use std::io::{Cursor, Read};
use std::path::Path;

use async_trait::async_trait;
use promote_schema::{PackageId, PackageIdentity, PackageMetadata, PackageVersion};
use thiserror::Error;
use tokio::io::AsyncWrite;

pub use cache::CachingFeed;
pub use nuget::{FeedCredentials, NuGetFeed};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{0} was not found")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
    },

    #[error("Invalid response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("Feed {feed} does not offer {capability}")]
    Unsupported { feed: String, capability: String },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Capabilities of one package repository.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Human-readable name, usually the feed URL.
    fn name(&self) -> &str;

    /// Every version of `id` the feed knows about, in no particular order.
    /// Fails with [`FeedError::NotFound`] if the id is unknown.
    async fn all_versions(&self, id: &PackageId) -> Result<Vec<PackageVersion>, FeedError>;

    /// Metadata for one exact package.
    async fn metadata(&self, identity: &PackageIdentity) -> Result<PackageMetadata, FeedError>;

    /// Whether the exact package exists.
    async fn exists(&self, identity: &PackageIdentity) -> Result<bool, FeedError>;

    /// Stream the package archive into `dest`.
    async fn copy_archive(
        &self,
        identity: &PackageIdentity,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), FeedError>;

    /// Push the archive at `path`. With `skip_duplicate`, pushing a version
    /// that already exists succeeds.
    async fn push_archive(&self, path: &Path, skip_duplicate: bool) -> Result<(), FeedError>;

    /// Open the package archive for reading individual entries.
    async fn open_archive(&self, identity: &PackageIdentity) -> Result<ArchiveReader, FeedError>;
}

/// Random access to the entries of a downloaded package archive.
pub struct ArchiveReader {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ArchiveReader {
    /// Open an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FeedError> {
        Ok(Self {
            archive: zip::ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    /// Read the entry at `path` as text. A missing entry is reported as
    /// [`FeedError::NotFound`], distinct from other failures.
    pub fn read_to_string(&mut self, path: &str) -> Result<String, FeedError> {
        let mut entry = match self.archive.by_name(path) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(FeedError::NotFound(format!("archive entry '{path}'")));
            }
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::zip_archive;

    #[test]
    fn test_archive_reader_distinguishes_missing_entries() {
        let bytes = zip_archive(&[("docs/LICENSE.txt", "MIT License")]);
        let mut reader = ArchiveReader::from_bytes(bytes).unwrap();

        assert_eq!(reader.read_to_string("docs/LICENSE.txt").unwrap(), "MIT License");
        assert!(reader.read_to_string("LICENSE").unwrap_err().is_not_found());
    }

    #[test]
    fn test_archive_reader_rejects_non_zip() {
        let err = ArchiveReader::from_bytes(b"not a zip".to_vec()).unwrap_err();
        assert!(matches!(err, FeedError::Archive(_)));
    }
}
