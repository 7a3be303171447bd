//! NuGet v3 protocol client.
//!
//! Only the resources needed for promotion are used: the flat container
//! (`PackageBaseAddress`) for version lists and archives, registrations for
//! per-version metadata, and `PackagePublish` for pushing.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use promote_schema::{
    Dependency, DependencyGroup, LicenseMetadata, PackageId, PackageIdentity, PackageMetadata,
    PackageVersion, VersionRange,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::OnceCell;

use super::{ArchiveReader, Feed, FeedError};

const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";
const PACKAGE_PUBLISH: &str = "PackagePublish/2.0.0";
/// Registration resource types, most preferred first.
const REGISTRATIONS: [&str; 4] = [
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl/3.0.0-rc",
    "RegistrationsBaseUrl",
];
const API_KEY_HEADER: &str = "X-NuGet-ApiKey";

#[derive(Debug, Clone, Default)]
pub struct FeedCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sent as `X-NuGet-ApiKey` when pushing.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
struct ServiceResources {
    flat_container: String,
    registrations: Option<String>,
    publish: Option<String>,
}

#[derive(Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: String,
}

#[derive(Deserialize)]
struct VersionList {
    versions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
    catalog_entry: CatalogRef,
    listed: Option<bool>,
    published: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogRef {
    Url(String),
    Inline(Box<CatalogEntry>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    #[serde(default)]
    dependency_groups: Vec<CatalogDependencyGroup>,
    license_expression: Option<String>,
    license_file: Option<String>,
    license_url: Option<String>,
    listed: Option<bool>,
    published: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDependencyGroup {
    target_framework: Option<String>,
    #[serde(default)]
    dependencies: Vec<CatalogDependency>,
}

#[derive(Deserialize)]
struct CatalogDependency {
    id: String,
    range: Option<String>,
}

/// A NuGet v3 feed, addressed by its service index URL.
///
/// The service index is fetched lazily on first use and then kept for the
/// lifetime of the value.
pub struct NuGetFeed {
    client: Client,
    index_url: String,
    credentials: FeedCredentials,
    resources: OnceCell<ServiceResources>,
}

impl std::fmt::Debug for NuGetFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NuGetFeed")
            .field("index_url", &self.index_url)
            .finish_non_exhaustive()
    }
}

impl NuGetFeed {
    /// Create a feed with its own HTTP client.
    pub fn new(index_url: impl Into<String>, credentials: FeedCredentials) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            index_url: index_url.into(),
            credentials,
            resources: OnceCell::new(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.credentials.username {
            Some(username) => request.basic_auth(username, self.credentials.password.as_deref()),
            None => request,
        }
    }

    /// Send a request. `Ok(None)` means the server answered 404.
    async fn send(&self, method: Method, url: &str) -> Result<Option<Response>, FeedError> {
        let response = self.request(method.clone(), url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(response))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, FeedError> {
        let Some(response) = self.send(Method::GET, url).await? else {
            return Ok(None);
        };
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| FeedError::Protocol {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn resources(&self) -> Result<&ServiceResources, FeedError> {
        self.resources
            .get_or_try_init(|| self.load_resources())
            .await
    }

    async fn load_resources(&self) -> Result<ServiceResources, FeedError> {
        tracing::debug!("Fetching service index {}", self.index_url);
        let index: ServiceIndex = self
            .get_json(&self.index_url)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("service index {}", self.index_url)))?;

        let find = |kind: &str| {
            index
                .resources
                .iter()
                .find(|r| r.kind == kind)
                .map(|r| r.id.trim_end_matches('/').to_string())
        };

        let flat_container = find(PACKAGE_BASE_ADDRESS).ok_or_else(|| FeedError::Protocol {
            url: self.index_url.clone(),
            message: format!("service index has no {PACKAGE_BASE_ADDRESS} resource"),
        })?;

        Ok(ServiceResources {
            flat_container,
            registrations: REGISTRATIONS.iter().find_map(|kind| find(kind)),
            publish: find(PACKAGE_PUBLISH),
        })
    }

    async fn archive_url(&self, identity: &PackageIdentity) -> Result<String, FeedError> {
        let resources = self.resources().await?;
        let id = identity.id.to_lowercase();
        let version = identity.version.to_string().to_lowercase();
        Ok(format!(
            "{}/{id}/{version}/{}",
            resources.flat_container,
            identity.archive_file_name()
        ))
    }

    async fn download(&self, identity: &PackageIdentity) -> Result<Response, FeedError> {
        let url = self.archive_url(identity).await?;
        self.send(Method::GET, &url)
            .await?
            .ok_or_else(|| FeedError::NotFound(identity.to_string()))
    }

    async fn catalog_entry(&self, leaf: RegistrationLeaf, url: &str) -> Result<CatalogEntry, FeedError> {
        match leaf.catalog_entry {
            CatalogRef::Inline(entry) => Ok(*entry),
            CatalogRef::Url(catalog_url) => self
                .get_json(&catalog_url)
                .await?
                .ok_or_else(|| FeedError::Protocol {
                    url: url.to_string(),
                    message: format!("catalog entry {catalog_url} does not exist"),
                }),
        }
    }
}

fn convert_groups(
    groups: Vec<CatalogDependencyGroup>,
    url: &str,
) -> Result<Vec<DependencyGroup>, FeedError> {
    groups
        .into_iter()
        .map(|group| {
            let dependencies = group
                .dependencies
                .into_iter()
                .map(|dependency| {
                    let range = match dependency.range.as_deref().map(str::trim) {
                        None | Some("") => VersionRange::all(),
                        Some(text) => {
                            VersionRange::parse(text).map_err(|e| FeedError::Protocol {
                                url: url.to_string(),
                                message: format!("dependency {}: {e}", dependency.id),
                            })?
                        }
                    };
                    Ok(Dependency::new(dependency.id, range))
                })
                .collect::<Result<Vec<_>, FeedError>>()?;
            Ok(DependencyGroup {
                target_framework: group.target_framework.filter(|tf| !tf.is_empty()),
                dependencies,
            })
        })
        .collect()
}

#[async_trait]
impl Feed for NuGetFeed {
    fn name(&self) -> &str {
        &self.index_url
    }

    async fn all_versions(&self, id: &PackageId) -> Result<Vec<PackageVersion>, FeedError> {
        let resources = self.resources().await?;
        let url = format!("{}/{}/index.json", resources.flat_container, id.to_lowercase());
        let list: VersionList = self
            .get_json(&url)
            .await?
            .ok_or_else(|| FeedError::NotFound(id.to_string()))?;

        Ok(list
            .versions
            .iter()
            .filter_map(|text| match PackageVersion::parse(text) {
                Ok(version) => Some(version),
                Err(e) => {
                    tracing::debug!("Ignoring version '{}' of {}: {}", text, id, e);
                    None
                }
            })
            .collect())
    }

    async fn metadata(&self, identity: &PackageIdentity) -> Result<PackageMetadata, FeedError> {
        let resources = self.resources().await?;
        let registrations =
            resources
                .registrations
                .as_deref()
                .ok_or_else(|| FeedError::Unsupported {
                    feed: self.index_url.clone(),
                    capability: "package registrations".to_string(),
                })?;

        let url = format!(
            "{registrations}/{}/{}.json",
            identity.id.to_lowercase(),
            identity.version.to_string().to_lowercase()
        );
        let leaf: RegistrationLeaf = self
            .get_json(&url)
            .await?
            .ok_or_else(|| FeedError::NotFound(identity.to_string()))?;

        let leaf_listed = leaf.listed;
        let leaf_published = leaf.published;
        let entry = self.catalog_entry(leaf, &url).await?;

        let mut metadata = PackageMetadata::new(identity.clone());
        metadata.listed = leaf_listed.or(entry.listed).unwrap_or(true);
        metadata.published = entry.published.or(leaf_published);
        metadata.dependency_groups = convert_groups(entry.dependency_groups, &url)?;
        metadata.license = LicenseMetadata {
            expression: entry.license_expression,
            file: entry.license_file,
            url: entry.license_url,
        };
        Ok(metadata)
    }

    async fn exists(&self, identity: &PackageIdentity) -> Result<bool, FeedError> {
        let url = self.archive_url(identity).await?;
        Ok(self.send(Method::HEAD, &url).await?.is_some())
    }

    async fn copy_archive(
        &self,
        identity: &PackageIdentity,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), FeedError> {
        let response = self.download(identity).await?;
        let mut stream = response.bytes_stream();
        let mut copied: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            dest.write_all(&chunk).await?;
            copied += chunk.len() as u64;
        }
        dest.flush().await?;
        tracing::debug!("Downloaded {} ({} bytes)", identity, copied);
        Ok(())
    }

    async fn push_archive(&self, path: &Path, skip_duplicate: bool) -> Result<(), FeedError> {
        let publish = self
            .resources()
            .await?
            .publish
            .as_deref()
            .ok_or_else(|| FeedError::Unsupported {
                feed: self.index_url.clone(),
                capability: PACKAGE_PUBLISH.to_string(),
            })?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "package.nupkg".to_string(), |n| n.to_string_lossy().into_owned());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("package", part);

        let mut request = self.request(Method::PUT, publish).multipart(form);
        if let Some(api_key) = &self.credentials.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else if status == StatusCode::CONFLICT && skip_duplicate {
            tracing::debug!("{} already exists at {}, skipped", path.display(), self.index_url);
            Ok(())
        } else {
            Err(FeedError::Status {
                method: Method::PUT.to_string(),
                url: publish.to_string(),
                status: status.as_u16(),
            })
        }
    }

    async fn open_archive(&self, identity: &PackageIdentity) -> Result<ArchiveReader, FeedError> {
        let bytes = self.download(identity).await?.bytes().await?;
        ArchiveReader::from_bytes(bytes.to_vec())
    }
}
