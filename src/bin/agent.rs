use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::config::Config;
use vigil::scheduler::Scheduler;
use vigil::storage::SqliteStore;

#[derive(Debug, Clone, Parser)]
#[command(name = "vigil-agent", about = "Host-metrics monitoring agent")]
struct Args {
    /// Dotenv file to load before reading the environment
    #[arg(short, long)]
    env_file: Option<PathBuf>,
}

fn init_logging(level: &str) {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let filter = filter::Targets::new().with_targets(vec![("vigil", level), ("vigil_agent", level)]);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(true),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    let config = Config::from_env().context("invalid configuration")?;
    init_logging(&config.log_level);

    info!("🚀 vigil agent starting (host: {})", config.host_label);

    if config.channels.is_empty() {
        warn!("no alert channel enabled, breaches will only be logged");
    }

    let store = SqliteStore::open(&config.db_file)
        .await
        .context("could not open the history store")?;
    info!("📊 history currently holds {} sample(s)", store.count().await?);

    Scheduler::new(config, store).run().await;

    Ok(())
}
