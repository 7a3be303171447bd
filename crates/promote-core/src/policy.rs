//! Turns version requests into concrete package identities.

use std::collections::BTreeSet;

use promote_schema::{
    PackageId, PackageIdentity, PackageRequest, PackageVersion, VersionPolicy, VersionRange,
};
use tokio_util::sync::CancellationToken;

use crate::cancel::{check, guard};
use crate::error::PromoteError;
use crate::feed::{Feed, FeedError};

/// Resolve every request against `feed` and union the results into one root set.
pub async fn resolve_requests(
    feed: &dyn Feed,
    requests: &[PackageRequest],
    cancel: &CancellationToken,
) -> Result<BTreeSet<PackageIdentity>, PromoteError> {
    let mut roots = BTreeSet::new();
    for request in requests {
        roots.extend(resolve_request(feed, request, cancel).await?);
    }
    Ok(roots)
}

/// Resolve each policy of one request independently and union the results.
pub async fn resolve_request(
    feed: &dyn Feed,
    request: &PackageRequest,
    cancel: &CancellationToken,
) -> Result<BTreeSet<PackageIdentity>, PromoteError> {
    let mut resolved = BTreeSet::new();
    for policy in request.policies() {
        let identities = resolve_policy(feed, request.id(), policy, cancel).await?;
        tracing::debug!("{} {} -> {} version(s)", request.id(), policy, identities.len());
        resolved.extend(identities);
    }
    Ok(resolved)
}

/// Resolve one version policy for one package id.
///
/// # Errors
///
/// - `Exact`: [`PromoteError::NotFound`] if the version has no metadata at the source.
/// - `Latest`: [`PromoteError::NoReleasedVersions`] if no listed release exists.
/// - Any: feed failures while listing versions, verbatim.
pub async fn resolve_policy(
    feed: &dyn Feed,
    id: &PackageId,
    policy: &VersionPolicy,
    cancel: &CancellationToken,
) -> Result<BTreeSet<PackageIdentity>, PromoteError> {
    match policy {
        VersionPolicy::Exact(version) => {
            let identity = PackageIdentity::new(id.clone(), version.clone());
            match guard(cancel, feed.metadata(&identity)).await {
                Ok(_) => Ok(BTreeSet::from([identity])),
                Err(PromoteError::Feed(FeedError::NotFound(_))) => {
                    Err(PromoteError::NotFound(identity.to_string()))
                }
                Err(e) => Err(e),
            }
        }
        VersionPolicy::Range(range) => resolve_range(feed, id, range, cancel).await,
        VersionPolicy::Latest => {
            let latest = resolve_latest(feed, id, cancel).await?;
            Ok(BTreeSet::from([latest]))
        }
    }
}

async fn resolve_range(
    feed: &dyn Feed,
    id: &PackageId,
    range: &VersionRange,
    cancel: &CancellationToken,
) -> Result<BTreeSet<PackageIdentity>, PromoteError> {
    let versions = guard(cancel, feed.all_versions(id)).await?;
    let mut candidates: Vec<PackageVersion> = versions
        .into_iter()
        .filter(|v| !v.is_prerelease() && range.satisfies(v))
        .collect();
    candidates.sort();
    candidates.dedup();

    let mut resolved = BTreeSet::new();
    for version in candidates {
        check(cancel)?;
        let identity = PackageIdentity::new(id.clone(), version);
        if is_listed(feed, &identity, cancel).await? {
            resolved.insert(identity);
        } else {
            tracing::debug!("Skipping {} (unlisted)", identity);
        }
    }
    Ok(resolved)
}

async fn resolve_latest(
    feed: &dyn Feed,
    id: &PackageId,
    cancel: &CancellationToken,
) -> Result<PackageIdentity, PromoteError> {
    let mut versions: Vec<PackageVersion> = guard(cancel, feed.all_versions(id))
        .await?
        .into_iter()
        .filter(|v| !v.is_prerelease())
        .collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions.dedup();

    for version in versions {
        check(cancel)?;
        let identity = PackageIdentity::new(id.clone(), version);
        if is_listed(feed, &identity, cancel).await? {
            return Ok(identity);
        }
        tracing::debug!("Skipping {} (unlisted)", identity);
    }

    Err(PromoteError::NoReleasedVersions(id.clone()))
}

/// Whether the version is listed. A version whose metadata is missing counts
/// as unpublished rather than as an error.
async fn is_listed(
    feed: &dyn Feed,
    identity: &PackageIdentity,
    cancel: &CancellationToken,
) -> Result<bool, PromoteError> {
    match guard(cancel, feed.metadata(identity)).await {
        Ok(metadata) => Ok(metadata.is_listed()),
        Err(PromoteError::Feed(FeedError::NotFound(_))) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFeed, identity};

    fn feed_with(versions: &[&str]) -> MemoryFeed {
        let feed = MemoryFeed::new("source");
        for version in versions {
            feed.add_package("Pkg", version, &[]);
        }
        feed
    }

    async fn resolve(feed: &MemoryFeed, policy: &str) -> Result<Vec<String>, PromoteError> {
        let cancel = CancellationToken::new();
        let policy: VersionPolicy = policy.parse().unwrap();
        let resolved = resolve_policy(feed, &"Pkg".into(), &policy, &cancel).await?;
        Ok(resolved.iter().map(|i| i.version.to_string()).collect())
    }

    #[tokio::test]
    async fn test_exact_requires_existence() {
        let feed = feed_with(&["1.0.0"]);
        assert_eq!(resolve(&feed, "1.0").await.unwrap(), vec!["1.0.0"]);

        let err = resolve(&feed, "2.0.0").await.unwrap_err();
        assert!(matches!(&err, PromoteError::NotFound(name) if name == "Pkg.2.0.0"));
    }

    #[tokio::test]
    async fn test_range_skips_prerelease_and_unlisted() {
        let feed = feed_with(&["1.0.0", "1.1.0-beta", "1.1.0", "1.2.0", "2.0.0"]);
        feed.set_listed(&identity("Pkg", "1.2.0"), false);

        let resolved = resolve(&feed, "[1.0,2.0)").await.unwrap();
        assert_eq!(resolved, vec!["1.0.0", "1.1.0"]);
    }

    #[tokio::test]
    async fn test_range_with_no_matches_is_empty() {
        let feed = feed_with(&["1.0.0"]);
        assert!(resolve(&feed, "[5.0,)").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_picks_newest_listed_release() {
        let feed = feed_with(&["1.0.0", "2.0.0", "3.0.0", "4.0.0-rc.1"]);
        feed.set_listed(&identity("Pkg", "3.0.0"), false);

        assert_eq!(resolve(&feed, "latest").await.unwrap(), vec!["2.0.0"]);
    }

    #[tokio::test]
    async fn test_latest_without_releases_fails() {
        let feed = feed_with(&["1.0.0-alpha", "1.0.0"]);
        feed.set_listed(&identity("Pkg", "1.0.0"), false);

        let err = resolve(&feed, "latest").await.unwrap_err();
        assert!(matches!(err, PromoteError::NoReleasedVersions(_)));
        assert!(err.to_string().contains("no released versions"));
    }

    #[tokio::test]
    async fn test_latest_propagates_version_list_failure() {
        let feed = MemoryFeed::new("source");
        let err = resolve(&feed, "latest").await.unwrap_err();
        assert!(matches!(err, PromoteError::Feed(FeedError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_request_unions_policies() {
        let feed = MemoryFeed::new("source");
        for version in ["4.1.0", "4.1.1", "4.3.0", "4.3.1"] {
            feed.add_package("System.Runtime", version, &[]);
        }
        let request =
            PackageRequest::parse("System.Runtime", &["[4.1.0,4.1.2)", "4.3.1", "4.1.1"]).unwrap();
        let cancel = CancellationToken::new();

        let resolved = resolve_requests(&feed, &[request], &cancel).await.unwrap();
        let versions: Vec<String> = resolved.iter().map(|i| i.version.to_string()).collect();
        assert_eq!(versions, vec!["4.1.0", "4.1.1", "4.3.1"]);
    }
}
