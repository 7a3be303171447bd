//! Version ranges in interval notation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::version::{PackageVersion, VersionError};

/// Errors produced when parsing a [`VersionRange`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// An interval was opened with `[`/`(` but not closed with `]`/`)`.
    #[error("Invalid range '{0}': unterminated interval")]
    Unterminated(String),

    /// The interval had more than one comma, or `(x)` was used.
    #[error("Invalid range '{0}': malformed interval")]
    Malformed(String),

    /// The lower bound is above the upper bound, or the interval is empty.
    #[error("Invalid range '{0}': interval is empty")]
    Empty(String),

    /// One of the bounds is not a valid version.
    #[error("Invalid range bound: {0}")]
    Bound(#[from] VersionError),
}

/// A version range in interval notation.
///
/// | Text          | Meaning              |
/// |---------------|----------------------|
/// | `1.0`         | `1.0 <= v`           |
/// | `[1.0]`       | `v == 1.0`           |
/// | `(1.0,)`      | `1.0 < v`            |
/// | `(,2.0]`      | `v <= 2.0`           |
/// | `[1.0,2.0)`   | `1.0 <= v < 2.0`     |
/// | `*` or empty  | any version          |
///
/// A prerelease version only satisfies a range when one of the range's
/// bounds is itself a prerelease.
///
/// # Example
///
/// ```
/// use promote_schema::{PackageVersion, VersionRange};
///
/// let range: VersionRange = "[4.1.0,4.1.2)".parse().unwrap();
/// assert!(range.satisfies(&"4.1.1".parse().unwrap()));
/// assert!(!range.satisfies(&"4.1.2".parse().unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    min: Option<PackageVersion>,
    min_inclusive: bool,
    max: Option<PackageVersion>,
    max_inclusive: bool,
}

impl VersionRange {
    /// A range accepting every version.
    pub fn all() -> Self {
        Self {
            min: None,
            min_inclusive: false,
            max: None,
            max_inclusive: false,
        }
    }

    /// `version <= v`, the meaning of a bare version in a dependency declaration.
    pub fn at_least(version: PackageVersion) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// A range matching exactly one version.
    pub fn exact(version: PackageVersion) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// Parse a range in interval notation.
    ///
    /// # Errors
    ///
    /// Returns a [`RangeError`] when the interval is malformed, a bound is
    /// not a valid version, or the interval cannot contain any version.
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let s = input.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::all());
        }

        let first = s.chars().next().unwrap_or_default();
        if first != '[' && first != '(' {
            return Ok(Self::at_least(PackageVersion::parse(s)?));
        }

        let last = s.chars().next_back().unwrap_or_default();
        if s.len() < 2 || (last != ']' && last != ')') {
            return Err(RangeError::Unterminated(input.to_string()));
        }

        let min_inclusive = first == '[';
        let max_inclusive = last == ']';
        let inner = &s[1..s.len() - 1];

        let range = match inner.split_once(',') {
            None => {
                // Only `[x]` is meaningful without a comma.
                if !min_inclusive || !max_inclusive {
                    return Err(RangeError::Malformed(input.to_string()));
                }
                Self::exact(PackageVersion::parse(inner)?)
            }
            Some((lower, upper)) => {
                if upper.contains(',') {
                    return Err(RangeError::Malformed(input.to_string()));
                }
                let min = parse_bound(lower)?;
                let max = parse_bound(upper)?;
                Self {
                    min_inclusive: min_inclusive && min.is_some(),
                    max_inclusive: max_inclusive && max.is_some(),
                    min,
                    max,
                }
            }
        };

        if let (Some(min), Some(max)) = (&range.min, &range.max) {
            let empty = min > max || (min == max && !(range.min_inclusive && range.max_inclusive));
            if empty {
                return Err(RangeError::Empty(input.to_string()));
            }
        }

        Ok(range)
    }

    /// Whether either bound is a prerelease, which opts the range into
    /// accepting prerelease versions.
    pub fn allows_prerelease(&self) -> bool {
        self.min.as_ref().is_some_and(PackageVersion::is_prerelease)
            || self.max.as_ref().is_some_and(PackageVersion::is_prerelease)
    }

    /// Whether `version` lies inside the range.
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        if version.is_prerelease() && !self.allows_prerelease() {
            return false;
        }

        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };

        above_min && below_max
    }

    /// The highest version in `versions` that satisfies the range.
    pub fn find_best_match<'a, I>(&self, versions: I) -> Option<&'a PackageVersion>
    where
        I: IntoIterator<Item = &'a PackageVersion>,
    {
        versions.into_iter().filter(|v| self.satisfies(v)).max()
    }
}

fn parse_bound(text: &str) -> Result<Option<PackageVersion>, RangeError> {
    let text = text.trim();
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(PackageVersion::parse(text)?))
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "*"),
            (Some(min), Some(max)) if min == max && self.min_inclusive && self.max_inclusive => {
                write!(f, "[{min}]")
            }
            (min, max) => {
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(min) = min {
                    write!(f, "{min}")?;
                }
                write!(f, ", ")?;
                if let Some(max) = max {
                    write!(f, "{max}")?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = RangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}
