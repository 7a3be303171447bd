//! In-memory test doubles shared by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use promote_schema::{
    Dependency, DependencyGroup, PackageId, PackageIdentity, PackageMetadata, PackageVersion,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::feed::{ArchiveReader, Feed, FeedError};
use crate::reporter::Reporter;

pub(crate) fn identity(id: &str, version: &str) -> PackageIdentity {
    PackageIdentity::new(id, version.parse().unwrap())
}

/// Build a zip archive in memory.
pub(crate) fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

struct MemoryPackage {
    metadata: PackageMetadata,
    archive: Vec<u8>,
}

/// A feed backed by a map, with call counting and failure injection.
pub(crate) struct MemoryFeed {
    name: String,
    packages: Mutex<BTreeMap<PackageIdentity, MemoryPackage>>,
    failing_downloads: Mutex<HashSet<PackageIdentity>>,
    failing_exists: Mutex<HashSet<PackageIdentity>>,
    pushed: Mutex<Vec<String>>,
    version_calls: Mutex<HashMap<PackageId, usize>>,
    metadata_calls: Mutex<HashMap<PackageIdentity, usize>>,
}

impl MemoryFeed {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            packages: Mutex::new(BTreeMap::new()),
            failing_downloads: Mutex::new(HashSet::new()),
            failing_exists: Mutex::new(HashSet::new()),
            pushed: Mutex::new(Vec::new()),
            version_calls: Mutex::new(HashMap::new()),
            metadata_calls: Mutex::new(HashMap::new()),
        }
    }

    /// Add a listed package whose dependencies are `(id, range)` pairs in a
    /// single group. The archive holds the text `"<id> <version>"`.
    pub(crate) fn add_package(
        &self,
        id: &str,
        version: &str,
        dependencies: &[(&str, &str)],
    ) -> PackageIdentity {
        let identity = identity(id, version);
        let mut metadata = PackageMetadata::new(identity.clone());
        if !dependencies.is_empty() {
            metadata.dependency_groups.push(DependencyGroup {
                target_framework: None,
                dependencies: dependencies
                    .iter()
                    .map(|(id, range)| Dependency::new(*id, range.parse().unwrap()))
                    .collect(),
            });
        }
        self.add_metadata(metadata);
        identity
    }

    pub(crate) fn add_metadata(&self, metadata: PackageMetadata) {
        let archive = format!("{} {}", metadata.identity.id, metadata.identity.version).into_bytes();
        self.add_metadata_with_archive(metadata, archive);
    }

    pub(crate) fn add_metadata_with_archive(&self, metadata: PackageMetadata, archive: Vec<u8>) {
        self.packages.lock().unwrap().insert(
            metadata.identity.clone(),
            MemoryPackage { metadata, archive },
        );
    }

    pub(crate) fn set_listed(&self, identity: &PackageIdentity, listed: bool) {
        if let Some(package) = self.packages.lock().unwrap().get_mut(identity) {
            package.metadata.listed = listed;
        }
    }

    pub(crate) fn fail_download(&self, identity: &PackageIdentity) {
        self.failing_downloads.lock().unwrap().insert(identity.clone());
    }

    pub(crate) fn fail_exists(&self, identity: &PackageIdentity) {
        self.failing_exists.lock().unwrap().insert(identity.clone());
    }

    /// Contents of every archive pushed so far, in push order.
    pub(crate) fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }

    pub(crate) fn version_calls(&self, id: &str) -> usize {
        self.version_calls
            .lock()
            .unwrap()
            .get(&PackageId::new(id))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn metadata_calls(&self, identity: &PackageIdentity) -> usize {
        self.metadata_calls
            .lock()
            .unwrap()
            .get(identity)
            .copied()
            .unwrap_or(0)
    }

    fn archive(&self, identity: &PackageIdentity) -> Result<Vec<u8>, FeedError> {
        if self.failing_downloads.lock().unwrap().contains(identity) {
            return Err(FeedError::Status {
                method: "GET".to_string(),
                url: format!("memory://{}/{}", self.name, identity.archive_file_name()),
                status: 500,
            });
        }
        self.packages
            .lock()
            .unwrap()
            .get(identity)
            .map(|p| p.archive.clone())
            .ok_or_else(|| FeedError::NotFound(identity.to_string()))
    }
}

#[async_trait]
impl Feed for MemoryFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn all_versions(&self, id: &PackageId) -> Result<Vec<PackageVersion>, FeedError> {
        *self
            .version_calls
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default() += 1;

        let versions: Vec<PackageVersion> = self
            .packages
            .lock()
            .unwrap()
            .keys()
            .filter(|identity| &identity.id == id)
            .map(|identity| identity.version.clone())
            .collect();
        if versions.is_empty() {
            Err(FeedError::NotFound(id.to_string()))
        } else {
            Ok(versions)
        }
    }

    async fn metadata(&self, identity: &PackageIdentity) -> Result<PackageMetadata, FeedError> {
        *self
            .metadata_calls
            .lock()
            .unwrap()
            .entry(identity.clone())
            .or_default() += 1;

        self.packages
            .lock()
            .unwrap()
            .get(identity)
            .map(|p| p.metadata.clone())
            .ok_or_else(|| FeedError::NotFound(identity.to_string()))
    }

    async fn exists(&self, identity: &PackageIdentity) -> Result<bool, FeedError> {
        if self.failing_exists.lock().unwrap().contains(identity) {
            return Err(FeedError::Status {
                method: "HEAD".to_string(),
                url: format!("memory://{}/{}", self.name, identity.archive_file_name()),
                status: 503,
            });
        }
        Ok(self.packages.lock().unwrap().contains_key(identity))
    }

    async fn copy_archive(
        &self,
        identity: &PackageIdentity,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), FeedError> {
        let archive = self.archive(identity)?;
        dest.write_all(&archive).await?;
        dest.flush().await?;
        Ok(())
    }

    async fn push_archive(&self, path: &Path, skip_duplicate: bool) -> Result<(), FeedError> {
        let content = String::from_utf8_lossy(&tokio::fs::read(path).await?).into_owned();
        let mut pushed = self.pushed.lock().unwrap();
        if pushed.contains(&content) {
            if skip_duplicate {
                return Ok(());
            }
            return Err(FeedError::Status {
                method: "PUT".to_string(),
                url: format!("memory://{}", self.name),
                status: 409,
            });
        }
        pushed.push(content);
        Ok(())
    }

    async fn open_archive(&self, identity: &PackageIdentity) -> Result<ArchiveReader, FeedError> {
        ArchiveReader::from_bytes(self.archive(identity)?)
    }
}

/// A reporter that records every call as a line of text.
#[derive(Default)]
pub(crate) struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn record(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, title: &str) {
        self.record(format!("section: {title}"));
    }
    fn resolving(&self, identity: &PackageIdentity) {
        self.record(format!("resolving: {identity}"));
    }
    fn resolved(&self, tree: &crate::tree::ResolutionTree) {
        self.record(format!("resolved: {} node(s)", tree.len()));
    }
    fn transferring(&self, identity: &PackageIdentity, index: usize, total: usize) {
        self.record(format!("transferring: {identity} ({index}/{total})"));
    }
    fn done(&self, identity: &PackageIdentity, detail: &str) {
        self.record(format!("done: {identity} {detail}"));
    }
    fn failed(&self, identity: &PackageIdentity, reason: &str) {
        self.record(format!("failed: {identity} {reason}"));
    }
    fn info(&self, msg: &str) {
        self.record(format!("info: {msg}"));
    }
    fn warning(&self, msg: &str) {
        self.record(format!("warning: {msg}"));
    }
    fn error(&self, msg: &str) {
        self.record(format!("error: {msg}"));
    }
    fn summary(&self, count: usize, action: &str, _elapsed_secs: f64) {
        self.record(format!("summary: {count} {action}"));
    }
}
