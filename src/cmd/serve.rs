//! Board server commands — `skiff serve` and `skiff init`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;

use skiff::board::db::{BoardDb, DatabaseLocation};
use skiff::board::server;
use skiff::config::SkiffToml;

pub async fn cmd_serve(
    project_dir: &Path,
    port: Option<u16>,
    db: Option<PathBuf>,
    open_browser: bool,
    dev: bool,
) -> Result<()> {
    let config = SkiffToml::load_or_default(project_dir)?;
    let server_config = config.server_config(port, db, dev)?;

    // Spawn browser open before starting the server (which blocks).
    // Skip in dev mode (no browser inside containers).
    if open_browser && !dev {
        let url = format!("http://{}:{}", server_config.host, server_config.port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        });
    }

    server::start_server(server_config).await
}

/// Create the database and run migrations without starting the server.
pub async fn cmd_init(project_dir: &Path, db: Option<PathBuf>) -> Result<()> {
    let config = SkiffToml::load_or_default(project_dir)?;
    config.validate()?;

    let location = match db {
        Some(path) => DatabaseLocation::Local(path),
        None => config.database(),
    };
    if let DatabaseLocation::Local(path) = &location {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    BoardDb::connect(&location).await?;

    match &location {
        DatabaseLocation::Local(path) => println!(
            "{} Board database initialized at {}",
            style("✓").green(),
            path.display()
        ),
        DatabaseLocation::Remote { url, .. } => println!(
            "{} Remote board database migrated at {}",
            style("✓").green(),
            url
        ),
    }
    Ok(())
}
