//! Layered configuration for the skiff CLI and server.
//!
//! Settings come from `skiff.toml` in the working directory, overridden by
//! environment variables, overridden by CLI flags:
//!
//! ```toml
//! [board]
//! key_prefix = "APP"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 2718
//!
//! [database]
//! path = ".skiff/board.db"
//! # Point at a hosted database instead of a local file:
//! # url = "libsql://my-board.example.io"
//! # auth_token_env = "SKIFF_DB_TOKEN"
//! ```
//!
//! Environment overrides: `SKIFF_KEY_PREFIX`, `SKIFF_HOST`, `SKIFF_PORT`,
//! `SKIFF_DB_PATH`, `SKIFF_DB_URL`, and the token variable named by
//! `auth_token_env`. A `.env` file is honored via dotenvy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::board::db::DatabaseLocation;
use crate::board::server::ServerConfig;

pub const CONFIG_FILE: &str = "skiff.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkiffToml {
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    /// Prefix of every issue key (`APP` in `APP-0001`).
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Local database file, used when no remote URL is configured.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Remote database URL (takes precedence over `path`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Name of the environment variable holding the remote auth token.
    #[serde(default = "default_token_env")]
    pub auth_token_env: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            url: None,
            auth_token_env: default_token_env(),
        }
    }
}

fn default_key_prefix() -> String {
    "APP".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2718
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".skiff/board.db")
}

fn default_token_env() -> String {
    "SKIFF_DB_TOKEN".to_string()
}

impl SkiffToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse skiff.toml")
    }

    /// Load `skiff.toml` from a directory, or defaults if absent.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize skiff.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Effective key prefix, with environment override.
    pub fn key_prefix(&self) -> String {
        std::env::var("SKIFF_KEY_PREFIX")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.board.key_prefix.clone())
    }

    pub fn host(&self) -> String {
        std::env::var("SKIFF_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.server.host.clone())
    }

    pub fn port(&self) -> u16 {
        std::env::var("SKIFF_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.server.port)
    }

    /// Effective database location. A remote URL (file or environment)
    /// wins over the local path; its auth token is read from the variable
    /// named by `auth_token_env`.
    pub fn database(&self) -> DatabaseLocation {
        let url = std::env::var("SKIFF_DB_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.database.url.clone());
        match url {
            Some(url) => DatabaseLocation::Remote {
                url,
                auth_token: std::env::var(&self.database.auth_token_env).unwrap_or_default(),
            },
            None => {
                let path = std::env::var("SKIFF_DB_PATH")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.database.path.clone());
                DatabaseLocation::Local(path)
            }
        }
    }

    /// Check the effective values. Key correctness depends on the prefix
    /// staying parseable, so a bad prefix is a hard error.
    pub fn validate(&self) -> Result<()> {
        let prefix = self.key_prefix();
        if !is_valid_prefix(&prefix) {
            anyhow::bail!(
                "Invalid key prefix '{}': must start with a letter and contain only letters and digits",
                prefix
            );
        }
        Ok(())
    }

    /// Resolve into a full server configuration. CLI flags win over
    /// environment and file values.
    pub fn server_config(
        &self,
        port_flag: Option<u16>,
        db_flag: Option<PathBuf>,
        dev: bool,
    ) -> Result<ServerConfig> {
        self.validate()?;
        let database = match db_flag {
            Some(path) => DatabaseLocation::Local(path),
            None => self.database(),
        };
        Ok(ServerConfig {
            host: self.host(),
            port: port_flag.unwrap_or_else(|| self.port()),
            database,
            key_prefix: self.key_prefix(),
            dev_mode: dev,
        })
    }
}

/// A key prefix must survive both `<PREFIX>-<digits>` formatting and the
/// literal regex match used to parse keys back.
fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = SkiffToml::default();
        assert_eq!(config.board.key_prefix, "APP");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 2718);
        assert_eq!(config.database.path, PathBuf::from(".skiff/board.db"));
        assert_eq!(config.database.url, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let content = r#"
[board]
key_prefix = "WEB"
"#;
        let config = SkiffToml::parse(content).unwrap();
        assert_eq!(config.board.key_prefix, "WEB");
        assert_eq!(config.server.port, 2718);
    }

    #[test]
    fn test_parse_full_file() {
        let content = r#"
[board]
key_prefix = "OPS"

[server]
host = "0.0.0.0"
port = 8080

[database]
url = "libsql://board.example.io"
auth_token_env = "BOARD_TOKEN"
"#;
        let config = SkiffToml::parse(content).unwrap();
        assert_eq!(config.board.key_prefix, "OPS");
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.database.url.as_deref(),
            Some("libsql://board.example.io")
        );
        assert_eq!(config.database.auth_token_env, "BOARD_TOKEN");
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        assert!(SkiffToml::parse("[board").is_err());
    }

    #[test]
    fn test_env_overrides_key_prefix() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = std::env::var("SKIFF_KEY_PREFIX").ok();
        unsafe { std::env::set_var("SKIFF_KEY_PREFIX", "ENV") };

        let config = SkiffToml::default();
        assert_eq!(config.key_prefix(), "ENV");

        match saved {
            Some(val) => unsafe { std::env::set_var("SKIFF_KEY_PREFIX", val) },
            None => unsafe { std::env::remove_var("SKIFF_KEY_PREFIX") },
        }
    }

    #[test]
    fn test_env_overrides_database_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = std::env::var("SKIFF_DB_URL").ok();
        unsafe { std::env::set_var("SKIFF_DB_URL", "libsql://env.example.io") };

        let config = SkiffToml::default();
        match config.database() {
            DatabaseLocation::Remote { url, .. } => {
                assert_eq!(url, "libsql://env.example.io");
            }
            other => panic!("Expected remote location, got {:?}", other),
        }

        match saved {
            Some(val) => unsafe { std::env::set_var("SKIFF_DB_URL", val) },
            None => unsafe { std::env::remove_var("SKIFF_DB_URL") },
        }
    }

    #[test]
    fn test_validate_rejects_bad_prefixes() {
        let _guard = ENV_MUTEX.lock().unwrap();
        for bad in ["", "1APP", "AP-P", "AP P", "AP.P"] {
            let mut config = SkiffToml::default();
            config.board.key_prefix = bad.to_string();
            assert!(config.validate().is_err(), "prefix {:?} should fail", bad);
        }
        for good in ["APP", "a", "Web2"] {
            let mut config = SkiffToml::default();
            config.board.key_prefix = good.to_string();
            assert!(config.validate().is_ok(), "prefix {:?} should pass", good);
        }
    }

    #[test]
    fn test_server_config_flag_precedence() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = SkiffToml::default();
        let server = config
            .server_config(Some(9000), Some(PathBuf::from("custom.db")), true)
            .unwrap();
        assert_eq!(server.port, 9000);
        assert_eq!(
            server.database,
            DatabaseLocation::Local(PathBuf::from("custom.db"))
        );
        assert!(server.dev_mode);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = SkiffToml::default();
        config.board.key_prefix = "OPS".to_string();
        config.save(&path).unwrap();

        let loaded = SkiffToml::load(&path).unwrap();
        assert_eq!(loaded.board.key_prefix, "OPS");

        let from_dir = SkiffToml::load_or_default(dir.path()).unwrap();
        assert_eq!(from_dir.board.key_prefix, "OPS");
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SkiffToml::load_or_default(dir.path()).unwrap();
        assert_eq!(config.board.key_prefix, "APP");
    }
}
