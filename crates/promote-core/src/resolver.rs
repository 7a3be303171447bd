//! Breadth-first dependency closure over the source feed.

use std::collections::BTreeSet;

use promote_schema::{PackageId, PackageIdentity, PackageInfo, PackageMetadata, VersionRange};
use tokio_util::sync::CancellationToken;

use crate::cancel::{check, guard};
use crate::error::PromoteError;
use crate::feed::{CachingFeed, Feed, FeedError};
use crate::queue::DistinctQueue;
use crate::reporter::Reporter;
use crate::tree::ResolutionTree;

/// Flags that change how far the closure reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Expand dependencies of packages that already exist at the destination.
    pub always_resolve_deps: bool,
    /// Skip destination existence checks and treat every package as missing.
    /// Implies `always_resolve_deps`.
    pub force_push: bool,
}

impl ResolveOptions {
    fn expands_existing(self) -> bool {
        self.always_resolve_deps || self.force_push
    }
}

/// Computes the set of packages a promotion has to consider.
///
/// Every identity is visited at most once per run, so cyclic dependency
/// graphs terminate. Version lists come from the source through a
/// [`CachingFeed`], so each dependency id is listed once per run no matter
/// how many packages depend on it.
pub struct DependencyResolver<'a> {
    source: &'a CachingFeed<'a>,
    destination: &'a dyn Feed,
    options: ResolveOptions,
    reporter: &'a dyn Reporter,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        source: &'a CachingFeed<'a>,
        destination: &'a dyn Feed,
        options: ResolveOptions,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            source,
            destination,
            options,
            reporter,
        }
    }

    /// Resolve the dependency closure of `roots`.
    ///
    /// # Errors
    ///
    /// Any feed failure aborts the run. A dependency range that no source
    /// version satisfies fails with [`PromoteError::Unsatisfiable`].
    ///
    /// # Panics
    ///
    /// Panics if the accumulated nodes and edges do not form a valid
    /// [`ResolutionTree`], which would be a bug in this resolver.
    pub async fn resolve(
        &self,
        roots: &BTreeSet<PackageIdentity>,
        cancel: &CancellationToken,
    ) -> Result<ResolutionTree, PromoteError> {
        let mut worklist: DistinctQueue<PackageIdentity> = roots.iter().cloned().collect();
        let mut nodes: Vec<PackageInfo> = Vec::new();
        let mut in_target: BTreeSet<PackageIdentity> = BTreeSet::new();
        let mut edges: BTreeSet<(PackageIdentity, PackageIdentity)> = BTreeSet::new();

        while let Some(identity) = worklist.pop() {
            check(cancel)?;
            self.reporter.resolving(&identity);

            let metadata = guard(cancel, self.source.metadata(&identity)).await?;
            nodes.push(PackageInfo::from(&metadata));

            if !self.options.force_push
                && guard(cancel, self.destination.exists(&identity)).await?
            {
                tracing::debug!("{} already exists at {}", identity, self.destination.name());
                in_target.insert(identity.clone());
                if !self.options.expands_existing() {
                    continue;
                }
            }

            for dependency in self.expand(&metadata, cancel).await? {
                edges.insert((identity.clone(), dependency.clone()));
                if worklist.push(dependency.clone()) {
                    tracing::debug!("{} -> {}", identity, dependency);
                }
            }
        }

        tracing::info!(
            "Resolved {} package(s) from {} root(s), {} already at the destination",
            nodes.len(),
            roots.len(),
            in_target.len()
        );

        match ResolutionTree::try_new(nodes, roots.iter().cloned(), in_target, edges) {
            Ok(tree) => Ok(tree),
            Err(e) => panic!("dependency resolver produced an inconsistent tree: {e}"),
        }
    }

    /// Pick the best source version for every distinct (id, range) the
    /// package declares.
    async fn expand(
        &self,
        metadata: &PackageMetadata,
        cancel: &CancellationToken,
    ) -> Result<Vec<PackageIdentity>, PromoteError> {
        let mut descriptors: DistinctQueue<(PackageId, VersionRange)> = metadata
            .dependency_descriptors()
            .into_iter()
            .flat_map(|descriptor| {
                let id = descriptor.id;
                descriptor
                    .ranges
                    .into_iter()
                    .map(move |range| (id.clone(), range))
            })
            .collect();

        let mut resolved = Vec::with_capacity(descriptors.len());
        while let Some((id, range)) = descriptors.pop() {
            check(cancel)?;

            let versions = match guard(cancel, self.source.all_versions(&id)).await {
                Ok(versions) => versions,
                Err(PromoteError::Feed(FeedError::NotFound(_))) => Vec::new(),
                Err(e) => return Err(e),
            };

            let Some(best) = range.find_best_match(&versions).cloned() else {
                return Err(PromoteError::Unsatisfiable {
                    dependent: metadata.identity.clone(),
                    dependency: id,
                    range,
                });
            };
            resolved.push(PackageIdentity::new(id, best));
        }
        Ok(resolved)
    }
}
