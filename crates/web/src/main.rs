use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use yatube_web::{WebConfig, WebServer};

#[derive(Parser)]
#[command(name = "yatube-web")]
#[command(about = "Yatube blogging platform web server")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "YATUBE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long, env = "YATUBE_LISTEN")]
    listen: Option<String>,

    /// Database path (overrides the config file)
    #[arg(long, env = "YATUBE_DB")]
    db: Option<PathBuf>,

    /// Media root (overrides the config file)
    #[arg(long, env = "YATUBE_MEDIA_ROOT")]
    media_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("Yatube web v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli
        .config
        .unwrap_or_else(yatube_web::config::default_config_path);
    let mut config = WebConfig::load(&config_path)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(media_root) = cli.media_root {
        config.media_root = media_root;
    }

    let addr: SocketAddr = config.listen.parse()?;
    tokio::fs::create_dir_all(&config.media_root).await?;

    info!(
        "Database: {:?}, media root: {:?}",
        config.db_path, config.media_root
    );

    WebServer::new(config)?.serve(addr).await
}
