//! NuGet package versions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors produced when parsing a [`PackageVersion`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The input was empty or only whitespace.
    #[error("Empty version string")]
    Empty,

    /// The numeric part did not have between one and four dot-separated components.
    #[error("Invalid version '{0}': expected 1 to 4 numeric components")]
    ComponentCount(String),

    /// A numeric component could not be parsed.
    #[error("Invalid version '{input}': '{component}' is not a number")]
    NotNumeric {
        /// The full input string.
        input: String,
        /// The offending component.
        component: String,
    },

    /// The prerelease label was malformed.
    #[error("Invalid prerelease label in '{input}': {reason}")]
    Prerelease {
        /// The full input string.
        input: String,
        /// Why the label was rejected.
        reason: String,
    },
}

/// A package version: `major.minor.patch[.revision][-prerelease][+metadata]`.
///
/// Missing `minor`/`patch` components parse as zero, so `4.1` and `4.1.0`
/// are the same version. Build metadata is accepted and discarded; it never
/// takes part in equality or ordering. Prerelease labels are compared with
/// semver precedence rules (case-insensitively, they are stored lowercased),
/// and a release always sorts above any of its prereleases.
///
/// # Example
///
/// ```
/// use promote_schema::PackageVersion;
///
/// let v: PackageVersion = "4.1".parse().unwrap();
/// assert_eq!(v.to_string(), "4.1.0");
///
/// let pre: PackageVersion = "4.1.0-beta.2".parse().unwrap();
/// assert!(pre.is_prerelease());
/// assert!(pre < v);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    pre: semver::Prerelease,
}

impl PackageVersion {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns a [`VersionError`] if the numeric part is malformed or the
    /// prerelease label is not a valid semver prerelease.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let without_metadata = trimmed.split_once('+').map_or(trimmed, |(v, _)| v);
        let (numbers, pre) = match without_metadata.split_once('-') {
            Some((numbers, pre)) => (numbers, Some(pre)),
            None => (without_metadata, None),
        };

        let components: Vec<&str> = numbers.split('.').collect();
        if components.is_empty() || components.len() > 4 {
            return Err(VersionError::ComponentCount(input.to_string()));
        }

        let mut parsed = [0u64; 4];
        for (slot, component) in parsed.iter_mut().zip(&components) {
            *slot = component
                .parse::<u64>()
                .map_err(|_| VersionError::NotNumeric {
                    input: input.to_string(),
                    component: (*component).to_string(),
                })?;
        }

        let pre = match pre {
            Some(label) => {
                semver::Prerelease::new(&label.to_ascii_lowercase()).map_err(|e| {
                    VersionError::Prerelease {
                        input: input.to_string(),
                        reason: e.to_string(),
                    }
                })?
            }
            None => semver::Prerelease::EMPTY,
        };
        if pre.is_empty() && without_metadata.ends_with('-') {
            return Err(VersionError::Prerelease {
                input: input.to_string(),
                reason: "empty label".to_string(),
            });
        }

        Ok(Self {
            major: parsed[0],
            minor: parsed[1],
            patch: parsed[2],
            revision: parsed[3],
            pre,
        })
    }

    /// Fourth (revision) component, zero when absent.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether this version carries a prerelease label.
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageVersion> for String {
    fn from(value: PackageVersion) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_short_forms_pad_with_zero() {
        assert_eq!(v("4"), v("4.0.0"));
        assert_eq!(v("4.1"), v("4.1.0"));
        assert_eq!(v("4.1.0.0"), v("4.1.0"));
        assert_eq!(v("4.1").to_string(), "4.1.0");
    }

    #[test]
    fn test_revision_is_kept() {
        let version = v("1.2.3.4");
        assert_eq!(version.revision(), 4);
        assert_eq!(version.to_string(), "1.2.3.4");
        assert!(version > v("1.2.3"));
    }

    #[test]
    fn test_metadata_is_ignored() {
        assert_eq!(v("1.0.0+abc"), v("1.0.0"));
        assert_eq!(v("1.0.0-rc.1+build.5").to_string(), "1.0.0-rc.1");
    }

    #[test]
    fn test_prerelease_ordering() {
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.11"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
        assert!(v("1.0.0") < v("1.0.1-alpha"));
        assert_eq!(v("1.0.0-Beta"), v("1.0.0-beta"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(PackageVersion::parse("  "), Err(VersionError::Empty));
        assert!(matches!(
            PackageVersion::parse("1.2.3.4.5"),
            Err(VersionError::ComponentCount(_))
        ));
        assert!(matches!(
            PackageVersion::parse("1.x"),
            Err(VersionError::NotNumeric { .. })
        ));
        assert!(matches!(
            PackageVersion::parse("1.0.0-"),
            Err(VersionError::Prerelease { .. })
        ));
    }
}
