//! `promote config`

use std::path::Path;

use anyhow::{Result, bail};
use promote_core::CancellationToken;
use promote_core::feed::FeedCredentials;
use promote_core::promote::PromoteOptions;

use super::{Plan, open_feed, promote};
use crate::config::{PromoteConfig, to_requests};

/// Run everything a `promote.toml` describes. Command-line flags are
/// combined with the file's `[options]`.
pub async fn config(
    file: &Path,
    flags: PromoteOptions,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let config = PromoteConfig::load(file)?;
    let plan = plan(config, flags)?;
    if plan.requests.is_empty() {
        bail!("{} lists no packages", file.display());
    }
    promote(&plan, verbose, cancel).await
}

fn plan(config: PromoteConfig, flags: PromoteOptions) -> Result<Plan> {
    let requests = to_requests(&config.packages)?;
    let source = open_feed(
        &config.source.url,
        FeedCredentials {
            username: config.source.username,
            password: config.source.password,
            api_key: None,
        },
    )?;
    let destination = open_feed(
        &config.destination.url,
        FeedCredentials {
            api_key: config.destination.api_key,
            ..FeedCredentials::default()
        },
    )?;
    Ok(Plan {
        source,
        destination,
        license: config.license,
        options: config.options.merge(flags),
        requests,
    })
}
