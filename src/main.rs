use anyhow::Context;
use clap::Parser;
use garden::{Cli, build_site};
use garden::serve::serve;
use garden::watch::watch;
use garden::Command;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli
        .garden_config()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            build_site(&config).context("building site")?;
        }
        Command::Serve { addr, watch } => {
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime
                .block_on(serve(config, addr, watch))
                .context("serving garden")?;
        }
        Command::Watch => {
            watch(&config).context("watching notes")?;
        }
    }

    Ok(())
}
