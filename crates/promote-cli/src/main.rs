//! promote - copy NuGet packages and their dependencies between feeds

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use promote_cli::Cli;
use promote_cli::cmd;
use promote_core::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise only our crates log, at debug with -v.
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("promote_core={level},promote_cli={level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    cmd::dispatch(cli, &cancel).await
}
