//! Package requests and the version policies they carry.

use std::fmt;
use std::str::FromStr;

use crate::id::PackageId;
use crate::range::{RangeError, VersionRange};
use crate::version::{PackageVersion, VersionError};

/// Errors produced when building a [`PackageRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The package id was empty.
    #[error("Package id must not be empty")]
    EmptyId,

    /// The request carried no version policies.
    #[error("Package request for '{0}' has no version policies")]
    NoPolicies(String),

    /// An exact version could not be parsed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// A version range could not be parsed.
    #[error(transparent)]
    Range(#[from] RangeError),
}

/// How the versions of one requested package are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionPolicy {
    /// Exactly this version, which must exist at the source.
    Exact(PackageVersion),
    /// Every listed release version inside the range.
    Range(VersionRange),
    /// The newest listed release version.
    Latest,
}

impl FromStr for VersionPolicy {
    type Err = RequestError;

    /// `latest` selects [`VersionPolicy::Latest`], text opening an interval
    /// (`[` or `(`) selects a range, anything else is an exact version.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            Ok(Self::Latest)
        } else if s.starts_with('[') || s.starts_with('(') {
            Ok(Self::Range(VersionRange::parse(s)?))
        } else {
            Ok(Self::Exact(PackageVersion::parse(s)?))
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(version) => write!(f, "{version}"),
            Self::Range(range) => write!(f, "{range}"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// A requested package id with one or more version policies, whose results
/// are unioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    id: PackageId,
    policies: Vec<VersionPolicy>,
}

impl PackageRequest {
    /// Create a request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::EmptyId`] for a blank id and
    /// [`RequestError::NoPolicies`] when `policies` is empty.
    pub fn new(id: impl Into<PackageId>, policies: Vec<VersionPolicy>) -> Result<Self, RequestError> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(RequestError::EmptyId);
        }
        if policies.is_empty() {
            return Err(RequestError::NoPolicies(id.to_string()));
        }
        Ok(Self { id, policies })
    }

    /// Parse a request from an id and textual version policies.
    /// No versions at all means `latest`.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestError`] when the id is blank or a policy is malformed.
    ///
    /// # Example
    ///
    /// ```
    /// use promote_schema::{PackageRequest, VersionPolicy};
    ///
    /// let request = PackageRequest::parse("System.Runtime", &["[4.1.0,4.1.2)", "4.3.1"]).unwrap();
    /// assert_eq!(request.policies().len(), 2);
    ///
    /// let latest = PackageRequest::parse("Newtonsoft.Json", &[] as &[&str]).unwrap();
    /// assert_eq!(latest.policies(), &[VersionPolicy::Latest]);
    /// ```
    pub fn parse<S: AsRef<str>>(id: &str, versions: &[S]) -> Result<Self, RequestError> {
        let mut policies = versions
            .iter()
            .map(|v| v.as_ref().parse())
            .collect::<Result<Vec<VersionPolicy>, _>>()?;
        if policies.is_empty() {
            policies.push(VersionPolicy::Latest);
        }
        Self::new(id.trim(), policies)
    }

    /// The requested package id.
    pub fn id(&self) -> &PackageId {
        &self.id
    }

    /// The version policies, in the order given.
    pub fn policies(&self) -> &[VersionPolicy] {
        &self.policies
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policies: Vec<String> = self.policies.iter().map(ToString::to_string).collect();
        write!(f, "{} {}", self.id, policies.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("LATEST".parse::<VersionPolicy>().unwrap(), VersionPolicy::Latest);
        assert!(matches!(
            "[1.0,2.0)".parse::<VersionPolicy>().unwrap(),
            VersionPolicy::Range(_)
        ));
        assert!(matches!(
            "(,2.0]".parse::<VersionPolicy>().unwrap(),
            VersionPolicy::Range(_)
        ));
        assert_eq!(
            "4.3.1".parse::<VersionPolicy>().unwrap(),
            VersionPolicy::Exact("4.3.1".parse().unwrap())
        );
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(
            PackageRequest::parse("  ", &["1.0"]),
            Err(RequestError::EmptyId)
        );
        assert_eq!(
            PackageRequest::new("a", vec![]),
            Err(RequestError::NoPolicies("a".to_string()))
        );
        assert!(matches!(
            PackageRequest::parse("a", &["[1.0"]),
            Err(RequestError::Range(_))
        ));
    }

    #[test]
    fn test_request_display() {
        let request = PackageRequest::parse("A", &["1.0", "latest"]).unwrap();
        assert_eq!(request.to_string(), "A 1.0.0 | latest");
    }
}
