//! Command implementations.

pub mod config;
pub mod list;
pub mod package;

use anyhow::{Context, Result, bail};
use promote_core::feed::{FeedCredentials, NuGetFeed};
use promote_core::license::LicenseConfig;
use promote_core::promote::{PromoteOptions, Promoter};
use promote_core::{CancellationToken, Feed, PromoteError, Reporter};
use promote_schema::PackageRequest;

use crate::config::load_license_config;
use crate::ui::ConsoleReporter;
use crate::{Cli, Commands, FeedArgs};

/// Run the selected subcommand.
pub async fn dispatch(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let options = cli.options();
    let verbose = cli.verbose;
    match cli.command {
        Commands::Package {
            id,
            versions,
            feeds,
        } => package::package(&id, &versions, &feeds, options, verbose, cancel).await,
        Commands::List { file, feeds } => list::list(&file, &feeds, options, verbose, cancel).await,
        Commands::Config { file } => config::config(&file, options, verbose, cancel).await,
    }
}

/// Everything one promotion run needs.
#[derive(Debug)]
pub struct Plan {
    pub source: NuGetFeed,
    pub destination: NuGetFeed,
    pub license: LicenseConfig,
    pub options: PromoteOptions,
    pub requests: Vec<PackageRequest>,
}

impl Plan {
    /// Build a plan from command-line feed arguments.
    pub fn from_args(
        feeds: &FeedArgs,
        options: PromoteOptions,
        requests: Vec<PackageRequest>,
    ) -> Result<Self> {
        let license = match &feeds.license_config {
            Some(path) => load_license_config(path)?,
            None => LicenseConfig::default(),
        };
        let source = open_feed(
            &feeds.source,
            FeedCredentials {
                username: feeds.source_username.clone(),
                password: feeds.source_password.clone(),
                api_key: None,
            },
        )?;
        let destination = open_feed(
            &feeds.destination,
            FeedCredentials {
                api_key: feeds.api_key.clone(),
                ..FeedCredentials::default()
            },
        )?;
        Ok(Self {
            source,
            destination,
            license,
            options,
            requests,
        })
    }
}

pub fn open_feed(url: &str, credentials: FeedCredentials) -> Result<NuGetFeed> {
    NuGetFeed::new(url, credentials).with_context(|| format!("Failed to set up feed {url}"))
}

/// Run a plan and report the outcome on the console.
pub async fn promote(plan: &Plan, verbose: bool, cancel: &CancellationToken) -> Result<()> {
    let reporter = ConsoleReporter::stdout(verbose);
    reporter.info(&format!(
        "Promoting {} request(s) from {} to {}",
        plan.requests.len(),
        plan.source.name(),
        plan.destination.name()
    ));
    for request in &plan.requests {
        tracing::debug!("Request: {}", request);
    }

    let promoter = Promoter::new(
        &plan.source,
        &plan.destination,
        &plan.license,
        plan.options,
        &reporter,
    );

    match promoter.run(&plan.requests, cancel).await {
        Ok(outcome) => {
            tracing::info!(
                "Promotion finished: {} resolved, {} transferred",
                outcome.tree.len(),
                outcome.transferred
            );
            Ok(())
        }
        Err(PromoteError::Compliance(compliance)) => {
            for violation in &compliance.violations {
                reporter.error(&violation.to_string());
            }
            bail!(
                "{} package(s) failed license validation",
                compliance.violations.len()
            )
        }
        Err(PromoteError::Cancelled) => {
            reporter.warning("Cancelled");
            bail!("Promotion cancelled")
        }
        Err(e) => {
            reporter.error(&e.to_string());
            Err(e).context("Promotion failed")
        }
    }
}
