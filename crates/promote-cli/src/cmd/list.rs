//! `promote list`

use std::path::Path;

use anyhow::{Result, bail};
use promote_core::CancellationToken;
use promote_core::promote::PromoteOptions;

use super::{Plan, promote};
use crate::FeedArgs;
use crate::config::load_package_list;

pub async fn list(
    file: &Path,
    feeds: &FeedArgs,
    options: PromoteOptions,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let requests = load_package_list(file)?;
    if requests.is_empty() {
        bail!("Package list {} is empty", file.display());
    }
    let plan = Plan::from_args(feeds, options, requests)?;
    promote(&plan, verbose, cancel).await
}
