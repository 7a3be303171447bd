//! Shared types for promote: package ids, versions, ranges, requests and
//! the metadata a feed reports for a package.

pub mod id;
pub mod metadata;
pub mod range;
pub mod request;
pub mod version;

// Re-exports
pub use id::{PackageId, PackageIdentity};
pub use metadata::{
    Dependency, DependencyDescriptor, DependencyGroup, LicenseInfo, LicenseKind, LicenseMetadata,
    PackageInfo, PackageMetadata,
};
pub use range::{RangeError, VersionRange};
pub use request::{PackageRequest, RequestError, VersionPolicy};
pub use version::{PackageVersion, VersionError};
