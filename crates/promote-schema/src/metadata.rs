//! Package metadata as reported by a feed: dependency groups, license
//! declaration and listing state.

use chrono::{DateTime, Datelike, Utc};
use std::fmt;

use crate::id::{PackageId, PackageIdentity};
use crate::range::VersionRange;

/// A single declared dependency: another package id and the acceptable range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Id of the package depended upon.
    pub id: PackageId,
    /// Acceptable versions of that package.
    pub range: VersionRange,
}

impl Dependency {
    /// Create a dependency.
    pub fn new(id: impl Into<PackageId>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }
}

/// Dependencies declared for one target framework (or for all of them when
/// `target_framework` is `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGroup {
    /// Target framework moniker of the group, if any.
    pub target_framework: Option<String>,
    /// Dependencies in the group.
    pub dependencies: Vec<Dependency>,
}

/// Every distinct range a package declares for one dependency id, across all
/// of its dependency groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// Id of the package depended upon.
    pub id: PackageId,
    /// Distinct ranges, in order of first declaration.
    pub ranges: Vec<VersionRange>,
}

/// License information exactly as the feed reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseMetadata {
    /// SPDX license expression, e.g. `MIT OR Apache-2.0`.
    pub expression: Option<String>,
    /// Path of a license file inside the package archive.
    pub file: Option<String>,
    /// License URL.
    pub url: Option<String>,
}

/// Metadata a feed returns for one exact package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// The package this metadata describes.
    pub identity: PackageIdentity,
    /// Feed-level listed flag.
    pub listed: bool,
    /// Publication time, when the feed reports one.
    pub published: Option<DateTime<Utc>>,
    /// Declared dependencies, grouped by target framework.
    pub dependency_groups: Vec<DependencyGroup>,
    /// Declared license.
    pub license: LicenseMetadata,
}

/// Feeds mark unlisted packages with a publication date in this year.
const UNLISTED_PUBLISH_YEAR: i32 = 1900;

impl PackageMetadata {
    /// Metadata for a listed package with no dependencies and no license.
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            listed: true,
            published: None,
            dependency_groups: Vec::new(),
            license: LicenseMetadata::default(),
        }
    }

    /// Whether the version is publicly listed: the listed flag is set and the
    /// publication date is not the unlisted sentinel.
    pub fn is_listed(&self) -> bool {
        self.listed
            && self
                .published
                .is_none_or(|published| published.year() != UNLISTED_PUBLISH_YEAR)
    }

    /// Group all declared dependencies by id, deduplicating ranges.
    ///
    /// Ids appear in order of first declaration so that expansion is
    /// deterministic for a given metadata document.
    pub fn dependency_descriptors(&self) -> Vec<DependencyDescriptor> {
        let mut descriptors: Vec<DependencyDescriptor> = Vec::new();
        for dependency in self
            .dependency_groups
            .iter()
            .flat_map(|group| &group.dependencies)
        {
            match descriptors.iter_mut().find(|d| d.id == dependency.id) {
                Some(existing) => {
                    if !existing.ranges.contains(&dependency.range) {
                        existing.ranges.push(dependency.range.clone());
                    }
                }
                None => descriptors.push(DependencyDescriptor {
                    id: dependency.id.clone(),
                    ranges: vec![dependency.range.clone()],
                }),
            }
        }
        descriptors
    }
}

/// Kind of license a package declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LicenseKind {
    /// SPDX expression.
    Expression,
    /// File inside the package archive.
    File,
    /// License URL.
    Url,
    /// No license information at all.
    None,
}

impl fmt::Display for LicenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Expression => "expression",
            Self::File => "file",
            Self::Url => "url",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// The single license classification of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseInfo {
    /// SPDX expression text.
    Expression(String),
    /// Path of the license file inside the archive.
    File(String),
    /// License URL.
    Url(String),
    /// No license declared.
    None,
}

impl LicenseInfo {
    /// Classify license metadata. Precedence is expression, then file, then
    /// URL; blank values count as absent.
    pub fn classify(license: &LicenseMetadata) -> Self {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(expression) = present(&license.expression) {
            Self::Expression(expression)
        } else if let Some(file) = present(&license.file) {
            Self::File(file)
        } else if let Some(url) = present(&license.url) {
            Self::Url(url)
        } else {
            Self::None
        }
    }

    /// The kind of this license.
    pub fn kind(&self) -> LicenseKind {
        match self {
            Self::Expression(_) => LicenseKind::Expression,
            Self::File(_) => LicenseKind::File,
            Self::Url(_) => LicenseKind::Url,
            Self::None => LicenseKind::None,
        }
    }

    /// The raw expression, path or URL; empty for [`LicenseInfo::None`].
    pub fn raw(&self) -> &str {
        match self {
            Self::Expression(s) | Self::File(s) | Self::Url(s) => s,
            Self::None => "",
        }
    }
}

/// A resolved node: package identity plus its classified license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// The package.
    pub identity: PackageIdentity,
    /// Its license classification.
    pub license: LicenseInfo,
}

impl From<&PackageMetadata> for PackageInfo {
    fn from(metadata: &PackageMetadata) -> Self {
        Self {
            identity: metadata.identity.clone(),
            license: LicenseInfo::classify(&metadata.license),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity() -> PackageIdentity {
        PackageIdentity::new("Pkg", "1.0.0".parse().unwrap())
    }

    #[test]
    fn test_unlisted_sentinel() {
        let mut metadata = PackageMetadata::new(identity());
        assert!(metadata.is_listed());

        metadata.published = Some(Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap());
        assert!(!metadata.is_listed());

        metadata.published = Some(Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap());
        assert!(metadata.is_listed());

        metadata.listed = false;
        assert!(!metadata.is_listed());
    }

    #[test]
    fn test_descriptors_group_and_dedupe() {
        let mut metadata = PackageMetadata::new(identity());
        metadata.dependency_groups = vec![
            DependencyGroup {
                target_framework: Some("net45".into()),
                dependencies: vec![
                    Dependency::new("A", "1.0".parse().unwrap()),
                    Dependency::new("B", "2.0".parse().unwrap()),
                ],
            },
            DependencyGroup {
                target_framework: Some("netstandard2.0".into()),
                dependencies: vec![
                    Dependency::new("a", "1.0".parse().unwrap()),
                    Dependency::new("A", "[1.5,2.0)".parse().unwrap()),
                ],
            },
        ];

        let descriptors = metadata.dependency_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].id, PackageId::new("A"));
        assert_eq!(descriptors[0].ranges.len(), 2);
        assert_eq!(descriptors[1].id, PackageId::new("B"));
    }

    #[test]
    fn test_license_precedence() {
        let mut license = LicenseMetadata {
            expression: Some("MIT".into()),
            file: Some("LICENSE.txt".into()),
            url: Some("https://aka.ms/deprecateLicenseUrl".into()),
        };
        assert_eq!(LicenseInfo::classify(&license), LicenseInfo::Expression("MIT".into()));

        license.expression = Some("  ".into());
        assert_eq!(LicenseInfo::classify(&license).kind(), LicenseKind::File);

        license.file = None;
        assert_eq!(LicenseInfo::classify(&license).kind(), LicenseKind::Url);

        license.url = None;
        assert_eq!(LicenseInfo::classify(&license), LicenseInfo::None);
        assert_eq!(LicenseInfo::None.raw(), "");
    }
}
