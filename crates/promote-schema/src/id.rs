//! Package ids and exact package identities.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::version::PackageVersion;

/// A case-insensitive package id.
///
/// The original casing is kept for display, while equality, hashing and
/// ordering all work on the ASCII-lowercased form.
///
/// # Example
///
/// ```
/// use promote_schema::PackageId;
///
/// let a = PackageId::new("System.Runtime");
/// let b = PackageId::new("system.runtime");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "System.Runtime");
/// assert_eq!(a.to_lowercase(), "system.runtime");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Create a package id, preserving the given casing.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the id as originally written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the lowercased id, as used in feed URLs and cache keys.
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An exact package: id plus concrete version.
///
/// Ordered by id (case-insensitive) and then by version, which is the
/// deterministic order used for listing, printing and transferring.
/// Displays in the conventional `Id.Version` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Package id.
    pub id: PackageId,
    /// Exact version.
    pub version: PackageVersion,
}

impl PackageIdentity {
    /// Create an identity from an id and a version.
    pub fn new(id: impl Into<PackageId>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// The archive file name used by feeds, e.g. `system.runtime.4.1.0.nupkg`.
    pub fn archive_file_name(&self) -> String {
        format!(
            "{}.{}.nupkg",
            self.id.to_lowercase(),
            self.version.to_string().to_ascii_lowercase()
        )
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(id, version.parse().unwrap())
    }

    #[test]
    fn test_id_equality_ignores_case() {
        let mut set = HashSet::new();
        set.insert(PackageId::new("Newtonsoft.Json"));
        assert!(set.contains(&PackageId::new("NEWTONSOFT.JSON")));
        assert!(!set.contains(&PackageId::new("Newtonsoft.Json.Bson")));
    }

    #[test]
    fn test_identity_equality() {
        assert_eq!(identity("A.B", "1.0"), identity("a.b", "1.0.0"));
        assert_ne!(identity("A.B", "1.0"), identity("A.B", "1.0.1"));
    }

    #[test]
    fn test_identity_ordering_is_id_then_version() {
        let mut list = vec![
            identity("b", "1.0.0"),
            identity("A", "2.0.0"),
            identity("a", "1.0.0"),
        ];
        list.sort();
        let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a.1.0.0", "A.2.0.0", "b.1.0.0"]);
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            identity("System.Runtime", "4.1.0-Beta").archive_file_name(),
            "system.runtime.4.1.0-beta.nupkg"
        );
    }
}
