//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

use promote_schema::PackageIdentity;

use crate::tree::ResolutionTree;

pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Resolving", "Transferring").
    fn section(&self, title: &str);

    /// A package has been taken off the resolution worklist.
    fn resolving(&self, identity: &PackageIdentity);

    /// Resolution finished and produced `tree`.
    fn resolved(&self, tree: &ResolutionTree);

    /// A package transfer is starting. `index` is 1-based.
    fn transferring(&self, identity: &PackageIdentity, index: usize, total: usize);

    /// Marks a package operation as successfully completed.
    fn done(&self, identity: &PackageIdentity, detail: &str);

    /// Marks a package operation as failed with a specific reason.
    fn failed(&self, identity: &PackageIdentity, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn resolving(&self, _: &PackageIdentity) {}
    fn resolved(&self, _: &ResolutionTree) {}
    fn transferring(&self, _: &PackageIdentity, _: usize, _: usize) {}
    fn done(&self, _: &PackageIdentity, _: &str) {}
    fn failed(&self, _: &PackageIdentity, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
