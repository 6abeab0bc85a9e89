use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(version, about = "Single-board issue tracker with a kanban HTTP API")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory containing skiff.toml (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board API server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Database file path (overrides skiff.toml)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Open the board in a browser after the server starts
        #[arg(long)]
        open: bool,

        /// Enable dev mode (permissive CORS for a local UI dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Initialize the board database without serving
    Init {
        /// Database file path (overrides skiff.toml)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// View or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Initialize a default skiff.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Serve {
            port,
            db,
            open,
            dev,
        } => {
            cmd::cmd_serve(&project_dir, *port, db.clone(), *open, *dev).await?;
        }
        Commands::Init { db } => {
            cmd::cmd_init(&project_dir, db.clone()).await?;
        }
        Commands::Config { command } => {
            cmd::cmd_config(&project_dir, command.clone())?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "skiff=debug" } else { "skiff=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
