use std::sync::Arc;

use clap::{Parser, Subcommand};
use hl_stats_core::{sink_from_config, ConfigLoader, Source};
use hl_stats_data::{ConsistencyChecker, DatabaseClient};
use hl_stats_pipeline::{HttpObjectStore, PipelineOrchestrator};

#[derive(Parser)]
#[command(name = "hl-stats")]
#[command(about = "Incremental cache materialization for Hyperliquid exchange dumps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every configured source up to today
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Report base-vs-cache divergence without writing anything
    Check {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run { config } => run(&config).await,
        Commands::Check { config } => check(&config).await,
    }
}

async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    let db = DatabaseClient::new(&config.database.url, config.database.max_connections).await?;
    let store = Arc::new(HttpObjectStore::new(
        &config.object_store.endpoint,
        &config.object_store.bucket,
    ));
    let alerts = sink_from_config(&config.alerts);

    PipelineOrchestrator::new(config, db, store, alerts).run().await
}

async fn check(config_path: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    let db = DatabaseClient::new(&config.database.url, config.database.max_connections).await?;
    let checker = ConsistencyChecker::new(db);

    for name in &config.pipeline.sources {
        let Some(source) = Source::parse(name) else {
            println!("{name}: unknown source");
            continue;
        };
        match checker.check(source).await? {
            Some(message) => println!("{message}"),
            None => println!("{source}: consistent"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_a_config_path() {
        let cli = Cli::try_parse_from(["hl-stats", "run", "--config", "custom.toml"]).unwrap();
        match cli.command {
            Commands::Run { config } => assert_eq!(config, "custom.toml"),
            Commands::Check { .. } => panic!("parsed the wrong subcommand"),
        }
    }
}
