// rest_api/src/main.rs

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lib::config::{load_config, StorageEngineType};

#[derive(Debug, Parser)]
#[command(name = "clinic-server", version, about = "Clinic administration and support chat API")]
struct Cli {
    /// YAML configuration file (defaults to ./clinic.yaml when present).
    #[arg(long, short, env = "CLINIC_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long, short)]
    port: Option<u16>,
    /// `sled` or `inmemory`.
    #[arg(long)]
    storage_engine: Option<StorageEngineType>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(engine) = cli.storage_engine {
        config.storage.engine = engine;
    }

    // Only Ctrl-C stops the standalone server.
    let (_shutdown_tx, shutdown_rx) = oneshot::channel();
    rest_api::start_server(config, shutdown_rx).await
}
