//! One promotion run, end to end.

use std::time::Instant;

use promote_schema::{PackageInfo, PackageRequest};
use tokio_util::sync::CancellationToken;

use crate::error::PromoteError;
use crate::feed::{CachingFeed, Feed};
use crate::license::{LicenseConfig, LicenseValidator};
use crate::policy::resolve_requests;
use crate::reporter::Reporter;
use crate::resolver::{DependencyResolver, ResolveOptions};
use crate::transfer::TransferPipeline;
use crate::tree::ResolutionTree;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromoteOptions {
    /// Resolve and validate, but push nothing.
    pub dry_run: bool,
    pub always_resolve_deps: bool,
    /// Push every resolved package, even ones the destination already has.
    pub force_push: bool,
}

impl From<PromoteOptions> for ResolveOptions {
    fn from(options: PromoteOptions) -> Self {
        Self {
            always_resolve_deps: options.always_resolve_deps,
            force_push: options.force_push,
        }
    }
}

#[derive(Debug)]
pub struct PromotionOutcome {
    pub tree: ResolutionTree,
    /// Packages pushed to the destination; zero on a dry run.
    pub transferred: usize,
}

/// Resolves requests against the source, gates on licenses and copies what
/// the destination is missing.
pub struct Promoter<'a> {
    source: &'a dyn Feed,
    destination: &'a dyn Feed,
    license: &'a LicenseConfig,
    options: PromoteOptions,
    reporter: &'a dyn Reporter,
}

impl<'a> Promoter<'a> {
    pub fn new(
        source: &'a dyn Feed,
        destination: &'a dyn Feed,
        license: &'a LicenseConfig,
        options: PromoteOptions,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            source,
            destination,
            license,
            options,
            reporter,
        }
    }

    /// # Errors
    ///
    /// The first resolution, license or transfer failure, or
    /// [`PromoteError::Cancelled`]. Nothing is pushed unless resolution and
    /// license validation both succeed.
    pub async fn run(
        &self,
        requests: &[PackageRequest],
        cancel: &CancellationToken,
    ) -> Result<PromotionOutcome, PromoteError> {
        let started = Instant::now();
        let source = CachingFeed::new(self.source);

        self.reporter.section("Resolving packages");
        let roots = resolve_requests(&source, requests, cancel).await?;
        if roots.is_empty() {
            self.reporter
                .warning("No package versions matched the requested policies");
        }
        tracing::info!("{} root package(s) from {} request(s)", roots.len(), requests.len());

        let resolver =
            DependencyResolver::new(&source, self.destination, self.options.into(), self.reporter);
        let tree = resolver.resolve(&roots, cancel).await?;
        self.reporter.resolved(&tree);

        self.reporter.section("Validating licenses");
        let packages: Vec<PackageInfo> = tree.nodes().cloned().collect();
        LicenseValidator::new(self.license, &source, self.reporter)
            .check_compliance(&packages, cancel)
            .await?;

        let pending = tree.packages_to_promote();
        if self.options.dry_run {
            self.reporter.info(&format!(
                "Dry run: {} package(s) would be promoted to {}",
                pending.len(),
                self.destination.name()
            ));
            return Ok(PromotionOutcome {
                tree,
                transferred: 0,
            });
        }
        if pending.is_empty() {
            self.reporter
                .info("Nothing to promote, the destination is up to date");
            return Ok(PromotionOutcome {
                tree,
                transferred: 0,
            });
        }

        self.reporter.section("Transferring packages");
        let transferred = TransferPipeline::new(&source, self.destination, self.reporter)
            .promote_all(&pending, cancel)
            .await?;
        self.reporter
            .summary(transferred, "promoted", started.elapsed().as_secs_f64());

        Ok(PromotionOutcome { tree, transferred })
    }
}
