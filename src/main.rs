use clap::Parser;
use issuezz_cache::cli::{self, Cli, Command};
use issuezz_cache::config::AppConfig;
use issuezz_cache::infrastructure::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    match cli.command {
        Command::Key(args) => cli::key::run(args).await,
        Command::Probe => cli::probe::run().await,
    }
}
