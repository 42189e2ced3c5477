mod completion;
mod config;
mod dispatch;
mod render;
mod self_update;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::dispatch::{run_cli, Cli};

const LOG_ENV: &str = "MODMAN_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_cli(cli)
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests;
