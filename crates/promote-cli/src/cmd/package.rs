//! `promote package`

use anyhow::{Context, Result};
use promote_core::CancellationToken;
use promote_core::promote::PromoteOptions;
use promote_schema::PackageRequest;

use super::{Plan, promote};
use crate::FeedArgs;

/// Promote a single package id under the given version policies.
pub async fn package(
    id: &str,
    versions: &[String],
    feeds: &FeedArgs,
    options: PromoteOptions,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let request = PackageRequest::parse(id, versions)
        .with_context(|| format!("Invalid package request '{id}'"))?;
    let plan = Plan::from_args(feeds, options, vec![request])?;
    promote(&plan, verbose, cancel).await
}
