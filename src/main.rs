use anyhow::Result;
use clap::Parser;
use doh_relay::{Config, SharedConfig, Topology};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Relay plain-text DNS lookups to a DNS-over-HTTPS resolver.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serve plaintext HTTP on the dev port instead of TLS with ACME certificates.
    #[arg(long)]
    dev: bool,

    /// JSON config file. Every key is optional.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let args = Args::parse();
    let config = config_init(args.config)?;
    let topology = Topology::from_dev_flag(args.dev);
    tracing::info!("starting in {topology:?} mode");

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        res = topology.run(config) => res?,
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doh_relay=info".into()),
        )
        .init();
}

fn config_init(config_file: Option<PathBuf>) -> Result<SharedConfig> {
    match config_file {
        None => Ok(Arc::new(Config::default())),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {}", config_file.display());
            Ok(Arc::new(config))
        }
    }
}
