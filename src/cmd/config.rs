//! Configuration view commands — `skiff config`.

use std::path::Path;

use anyhow::Result;
use console::style;

use skiff::config::{CONFIG_FILE, SkiffToml};

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = project_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Skiff Configuration").bold());
            println!();

            let config = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                SkiffToml::load(&config_path)?
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Run 'skiff config init' to create one.");
                SkiffToml::default()
            };
            println!();

            println!("[board]");
            println!("  key_prefix = \"{}\"", config.board.key_prefix);
            println!();
            println!("[server]");
            println!("  host = \"{}\"", config.server.host);
            println!("  port = {}", config.server.port);
            println!();
            println!("[database]");
            println!("  path = \"{}\"", config.database.path.display());
            if let Some(url) = &config.database.url {
                println!("  url = \"{}\"", url);
            }
            println!("  auth_token_env = \"{}\"", config.database.auth_token_env);
            println!();

            println!("Effective values (with env overrides):");
            println!("  key_prefix = \"{}\"", config.key_prefix());
            println!("  host = \"{}\"", config.host());
            println!("  port = {}", config.port());
            match config.database() {
                skiff::board::db::DatabaseLocation::Local(path) => {
                    println!("  database = local file {}", path.display());
                }
                skiff::board::db::DatabaseLocation::Remote { url, .. } => {
                    println!("  database = remote {}", url);
                }
            }
            println!();

            if let Err(e) = config.validate() {
                println!("{} {}", style("Warning:").yellow().bold(), e);
                println!();
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE, config_path.display());
                return Ok(());
            }
            SkiffToml::default().save(&config_path)?;
            println!(
                "{} Created {}",
                style("✓").green(),
                config_path.display()
            );
        }
    }
    Ok(())
}
