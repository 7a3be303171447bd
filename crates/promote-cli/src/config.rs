//! Configuration files: `promote.toml`, standalone license configs and YAML
//! package lists.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use promote_core::license::LicenseConfig;
use promote_core::promote::PromoteOptions;
use promote_schema::PackageRequest;
use serde::Deserialize;

/// A `promote.toml` file.
///
/// ```toml
/// [source]
/// url = "https://api.nuget.org/v3/index.json"
///
/// [destination]
/// url = "https://nuget.internal/v3/index.json"
/// api_key = "..."
///
/// [options]
/// always_resolve_deps = true
///
/// [license]
/// enabled = true
/// accepted_expressions = ["MIT", "Apache-2.0"]
/// accepted_files = ["licenses/mit.txt"]
///
/// [[packages]]
/// id = "Newtonsoft.Json"
/// versions = ["[12.0,)", "latest"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromoteConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    pub dry_run: bool,
    pub always_resolve_deps: bool,
    pub force_push: bool,
}

impl OptionsConfig {
    /// Combine with command-line flags; a flag that is set always wins.
    pub fn merge(self, flags: PromoteOptions) -> PromoteOptions {
        let force_push = self.force_push || flags.force_push;
        PromoteOptions {
            dry_run: self.dry_run || flags.dry_run,
            always_resolve_deps: self.always_resolve_deps || flags.always_resolve_deps || force_push,
            force_push,
        }
    }
}

/// One package to promote. Without versions, the latest release is used.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    pub id: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

impl PackageEntry {
    pub fn to_request(&self) -> Result<PackageRequest> {
        PackageRequest::parse(&self.id, &self.versions)
            .with_context(|| format!("Invalid package entry '{}'", self.id))
    }
}

/// Turn package entries into requests, failing on the first invalid one.
pub fn to_requests(entries: &[PackageEntry]) -> Result<Vec<PackageRequest>> {
    entries.iter().map(PackageEntry::to_request).collect()
}

impl PromoteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        resolve_license_paths(&mut config.license, path);
        Ok(config)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LicenseFile {
    license: LicenseConfig,
}

/// Load a standalone license configuration: a TOML file with a `[license]`
/// table.
pub fn load_license_config(path: &Path) -> Result<LicenseConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read license config {}", path.display()))?;
    let mut file: LicenseFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse license config {}", path.display()))?;
    resolve_license_paths(&mut file.license, path);
    Ok(file.license)
}

/// Load a YAML package list.
///
/// ```yaml
/// - id: Newtonsoft.Json
///   versions: ["13.0.1", "latest"]
/// - id: Serilog
/// ```
pub fn load_package_list(path: &Path) -> Result<Vec<PackageRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read package list {}", path.display()))?;
    let entries: Vec<PackageEntry> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse package list {}", path.display()))?;
    to_requests(&entries)
}

/// Relative accepted license files are relative to the file that names them.
fn resolve_license_paths(license: &mut LicenseConfig, config_path: &Path) {
    let base = config_path.parent().unwrap_or_else(|| Path::new(""));
    for file in &mut license.accepted_files {
        if file.is_relative() {
            *file = base.join(&*file);
        }
    }
}
