//! promote - copy NuGet packages and their dependencies between feeds
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves the requested package versions at a source feed, walks their
//! dependency closure, stops at anything the destination already has,
//! optionally gates on licenses, and pushes the rest.
//!
//! Three ways to say what to promote:
//!
//! - `promote package <ID> --version <POLICY>...` for one package
//! - `promote list <FILE>` for a YAML list of `{ id, versions }` entries
//! - `promote config <FILE>` for a `promote.toml` describing feeds,
//!   options, license rules and packages

pub mod cmd;
pub mod config;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use promote_core::promote::PromoteOptions;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "promote")]
#[command(
    author,
    version,
    about = "Promote NuGet packages and their dependencies from one feed to another"
)]
pub struct Cli {
    /// Resolve and validate without pushing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Also walk the dependencies of packages the destination already has
    #[arg(long, global = true)]
    pub always_resolve_deps: bool,

    /// Push every resolved package even if the destination has it (implies --always-resolve-deps)
    #[arg(long, global = true)]
    pub force_push: bool,

    /// Show debug logs and every package as it is resolved
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Options selected by the global flags.
    pub fn options(&self) -> PromoteOptions {
        PromoteOptions {
            dry_run: self.dry_run,
            always_resolve_deps: self.always_resolve_deps || self.force_push,
            force_push: self.force_push,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Promote one package
    Package {
        /// Package id
        id: String,
        /// Version policy: an exact version, a range like [1.0,2.0) or `latest` (repeatable)
        #[arg(long = "version", value_name = "POLICY")]
        versions: Vec<String>,
        #[command(flatten)]
        feeds: FeedArgs,
    },
    /// Promote every package in a YAML list file
    List {
        /// YAML file with a sequence of { id, versions } entries
        file: PathBuf,
        #[command(flatten)]
        feeds: FeedArgs,
    },
    /// Promote everything described by a promote.toml file
    Config {
        /// Configuration file
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct FeedArgs {
    /// Service index URL of the feed to promote from
    #[arg(long, env = "PROMOTE_SOURCE")]
    pub source: String,

    /// Service index URL of the feed to promote to
    #[arg(long, env = "PROMOTE_DESTINATION")]
    pub destination: String,

    /// User name for the source feed
    #[arg(long, env = "PROMOTE_SOURCE_USERNAME")]
    pub source_username: Option<String>,

    /// Password or token for the source feed
    #[arg(long, env = "PROMOTE_SOURCE_PASSWORD", hide_env_values = true)]
    pub source_password: Option<String>,

    /// API key used to push to the destination feed
    #[arg(long, env = "PROMOTE_DESTINATION_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// TOML file with a [license] table enabling license validation
    #[arg(long, value_name = "FILE")]
    pub license_config: Option<PathBuf>,
}
