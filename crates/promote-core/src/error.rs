//! Error taxonomy for a promotion run.

use promote_schema::{PackageId, PackageIdentity, VersionRange};
use thiserror::Error;

use crate::feed::FeedError;
use crate::license::ComplianceError;

#[derive(Error, Debug)]
pub enum PromoteError {
    #[error("Package {0} was not found at the source")]
    NotFound(String),

    #[error("Package {0} has no released versions")]
    NoReleasedVersions(PackageId),

    #[error("No version of {dependency} matches {range} (required by {dependent})")]
    Unsatisfiable {
        dependent: PackageIdentity,
        dependency: PackageId,
        range: VersionRange,
    },

    /// Feed failures are surfaced verbatim.
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error("Failed to download package {identity}")]
    Download {
        identity: PackageIdentity,
        #[source]
        source: FeedError,
    },

    #[error("Failed to push package {identity}")]
    Push {
        identity: PackageIdentity,
        #[source]
        source: FeedError,
    },

    #[error("Transfer stopped after {completed} of {total} package(s)")]
    Transfer {
        completed: usize,
        total: usize,
        #[source]
        source: Box<PromoteError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PromoteError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
