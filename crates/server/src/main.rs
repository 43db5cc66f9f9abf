mod api;
mod cli;
mod router;
mod startup;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docvault_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = cli::Cli::parse();
    let config = cli.load_config();
    cli::dispatch(&config, cli.command).await
}
