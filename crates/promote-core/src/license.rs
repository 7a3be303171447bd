//! License compliance gate.
//!
//! Every resolved package must carry a license that the configuration
//! accepts. Expressions and URLs are matched literally. License files are
//! read out of the package archive and compared against local reference
//! files after [`normalize_license_text`].

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use promote_schema::{LicenseInfo, LicenseKind, PackageId, PackageIdentity, PackageInfo, PackageVersion};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cancel::{check, guard};
use crate::error::PromoteError;
use crate::feed::{ArchiveReader, Feed, FeedError};
use crate::reporter::Reporter;

/// Which licenses are acceptable.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LicenseConfig {
    pub enabled: bool,
    pub accepted_expressions: Vec<String>,
    pub accepted_urls: Vec<String>,
    /// Reference license texts on local disk.
    pub accepted_files: Vec<PathBuf>,
    /// `Id.Version` of packages allowed to have no license at all. The
    /// version may be written in any equivalent form (`2.0` or `2.0.0`).
    pub accept_no_license: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseViolation {
    pub identity: PackageIdentity,
    pub kind: LicenseKind,
    /// The expression, file path or URL as declared; empty for no license.
    pub license: String,
    pub reason: String,
}

impl fmt::Display for LicenseViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.license.is_empty() {
            write!(f, "{} (no license): {}", self.identity, self.reason)
        } else {
            write!(
                f,
                "{} ({} '{}'): {}",
                self.identity, self.kind, self.license, self.reason
            )
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Error, Debug, Clone)]
#[error("{} package(s) failed license validation:{}", .violations.len(), list(.violations))]
pub struct ComplianceError {
    pub violations: Vec<LicenseViolation>,
}

fn list(violations: &[LicenseViolation]) -> String {
    violations.iter().map(|v| format!("\n  - {v}")).collect()
}

static COPYRIGHT_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(copyright(?: ?(?:\(c\)|©))?) ?[0-9]{4}\b(?: ?- ?[0-9]{4}\b)?")
        .unwrap_or_else(|e| panic!("invalid copyright pattern: {e}"))
});

/// Canonical form used to compare license texts: lowercase, whitespace runs
/// collapsed to single spaces, and copyright years replaced by `<year>`.
/// A leading byte-order mark is dropped.
///
/// ```
/// use promote_core::license::normalize_license_text;
///
/// assert_eq!(
///     normalize_license_text("Copyright (c) 2019-2021\n  Contoso"),
///     "copyright (c) <year> contoso"
/// );
/// ```
pub fn normalize_license_text(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let collapsed = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    COPYRIGHT_YEAR
        .replace_all(&collapsed, "${1} <year>")
        .into_owned()
}

/// Whether an `Id.Version` entry names `identity`. Ids may contain dots
/// followed by digits, so every such split is tried.
fn names_identity(entry: &str, identity: &PackageIdentity) -> bool {
    let entry = entry.trim();
    entry
        .char_indices()
        .filter(|&(i, c)| c == '.' && entry[i + 1..].starts_with(|n: char| n.is_ascii_digit()))
        .any(|(i, _)| {
            PackageId::from(&entry[..i]) == identity.id
                && PackageVersion::parse(&entry[i + 1..]).is_ok_and(|v| v == identity.version)
        })
}

pub struct LicenseValidator<'a> {
    config: &'a LicenseConfig,
    feed: &'a dyn Feed,
    reporter: &'a dyn Reporter,
}

impl<'a> LicenseValidator<'a> {
    /// `feed` is where package archives are read from for file licenses.
    pub fn new(config: &'a LicenseConfig, feed: &'a dyn Feed, reporter: &'a dyn Reporter) -> Self {
        Self {
            config,
            feed,
            reporter,
        }
    }

    /// Check every package and fail with all violations at once.
    ///
    /// # Errors
    ///
    /// [`PromoteError::Compliance`] if any package is rejected, or
    /// [`PromoteError::Cancelled`].
    pub async fn check_compliance(
        &self,
        packages: &[PackageInfo],
        cancel: &CancellationToken,
    ) -> Result<(), PromoteError> {
        if !self.config.enabled {
            tracing::info!("License validation is disabled, skipped");
            self.reporter.info("License validation skipped (disabled)");
            return Ok(());
        }

        let mut accepted_texts: Option<Vec<String>> = None;
        let mut violations = Vec::new();

        for package in packages {
            check(cancel)?;
            if let Some(reason) = self.check_package(package, &mut accepted_texts, cancel).await? {
                tracing::debug!("{} rejected: {}", package.identity, reason);
                violations.push(LicenseViolation {
                    identity: package.identity.clone(),
                    kind: package.license.kind(),
                    license: package.license.raw().to_string(),
                    reason,
                });
            }
        }

        if violations.is_empty() {
            self.reporter.info(&format!(
                "License validation passed for {} package(s)",
                packages.len()
            ));
            Ok(())
        } else {
            Err(ComplianceError { violations }.into())
        }
    }

    /// The reason `package` is rejected, if it is.
    async fn check_package(
        &self,
        package: &PackageInfo,
        accepted_texts: &mut Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, PromoteError> {
        let reason = match &package.license {
            LicenseInfo::Expression(expression) => (!self
                .config
                .accepted_expressions
                .contains(expression))
            .then(|| "license expression is not accepted".to_string()),

            LicenseInfo::Url(url) => (!self.config.accepted_urls.contains(url))
                .then(|| "license URL is not accepted".to_string()),

            LicenseInfo::None => (!self
                .config
                .accept_no_license
                .iter()
                .any(|accepted| names_identity(accepted, &package.identity)))
            .then(|| "package has no license and is not allowed to".to_string()),

            LicenseInfo::File(path) => {
                if accepted_texts.is_none() {
                    *accepted_texts = Some(self.load_accepted_files().await);
                }
                let accepted = accepted_texts.as_deref().unwrap_or_default();
                self.check_file(&package.identity, path, accepted, cancel)
                    .await?
            }
        };
        Ok(reason)
    }

    async fn check_file(
        &self,
        identity: &PackageIdentity,
        path: &str,
        accepted: &[String],
        cancel: &CancellationToken,
    ) -> Result<Option<String>, PromoteError> {
        let mut archive = match guard(cancel, self.feed.open_archive(identity)).await {
            Ok(archive) => archive,
            Err(PromoteError::Cancelled) => return Err(PromoteError::Cancelled),
            Err(e) => return Ok(Some(format!("failed to download package: {e}"))),
        };

        let text = match read_license_entry(&mut archive, path) {
            Ok(text) => text,
            Err(FeedError::NotFound(_)) => {
                return Ok(Some("license file is missing from the package".to_string()));
            }
            Err(e) => return Ok(Some(format!("failed to read license file: {e}"))),
        };

        let normalized = normalize_license_text(&text);
        if accepted.iter().any(|candidate| *candidate == normalized) {
            Ok(None)
        } else {
            Ok(Some(
                "license file does not match any accepted license file".to_string(),
            ))
        }
    }

    /// Read and normalize every accepted file. Unreadable files are skipped.
    async fn load_accepted_files(&self) -> Vec<String> {
        let mut texts = Vec::with_capacity(self.config.accepted_files.len());
        for path in &self.config.accepted_files {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => texts.push(normalize_license_text(&text)),
                Err(e) => {
                    tracing::warn!("Skipping accepted license file {}: {}", path.display(), e);
                    self.reporter.warning(&format!(
                        "Could not read accepted license file {}: {e}",
                        path.display()
                    ));
                }
            }
        }
        texts
    }
}

/// Read the declared path, falling back to the path with backslashes
/// turned into forward slashes.
fn read_license_entry(archive: &mut ArchiveReader, path: &str) -> Result<String, FeedError> {
    match archive.read_to_string(path) {
        Err(FeedError::NotFound(_)) if path.contains('\\') => {
            archive.read_to_string(&path.replace('\\', "/"))
        }
        other => other,
    }
}
