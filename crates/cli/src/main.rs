//! Yatube CLI - Main Entry Point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use yatube_common::Database;

use yatube_cli::commands::{cache, group, post, status, user};
use yatube_cli::output;

/// Yatube maintenance CLI
#[derive(Parser)]
#[command(name = "yatube")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Database path
    #[arg(long, env = "YATUBE_DB", global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the page cache
    #[command(subcommand)]
    Cache(cache::CacheCommands),

    /// Manage groups
    #[command(subcommand)]
    Group(group::GroupCommands),

    /// Manage users
    #[command(subcommand)]
    User(user::UserCommands),

    /// Inspect posts
    #[command(subcommand)]
    Post(post::PostCommands),

    /// Show database summary
    Status,

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("Yatube CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let db_path = cli.db.unwrap_or_else(yatube_common::default_db_path);
    debug!("Opening database {:?}", db_path);
    let db = Database::open(&db_path)?;

    match cli.command {
        Commands::Cache(cmd) => cache::execute(cmd, &db, cli.format)?,
        Commands::Group(cmd) => group::execute(cmd, &db, cli.format)?,
        Commands::User(cmd) => user::execute(cmd, &db, cli.format)?,
        Commands::Post(cmd) => post::execute(cmd, &db, cli.format)?,
        Commands::Status => status::execute(&db, &db_path, cli.format)?,
        Commands::Version => {}
    }

    Ok(())
}
