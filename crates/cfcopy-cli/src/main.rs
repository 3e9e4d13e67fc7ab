mod cli;
mod context;
mod objects;
mod transfers;

use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::context::AppContext;
use crate::objects::{run_get, run_put, run_stat};
use crate::transfers::run_copy;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(dir) = cli.config_dir.as_ref() {
        cfcopy_core::config::set_config_dir(dir);
    }
    let ctx = AppContext::load()?;

    match &cli.command {
        Commands::Copy(args) => run_copy(&ctx, args).await?,
        Commands::Stat(args) => run_stat(&ctx, args).await?,
        Commands::Get(args) => run_get(&ctx, args).await?,
        Commands::Put(args) => run_put(&ctx, args).await?,
    }

    Ok(())
}
