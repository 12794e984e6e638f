//! Configuration for the engine and the `qx` binary.
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/app"
//! max_connections = 5
//!
//! [log]
//! level = "info"
//! ```
//!
//! Lookup order: an explicit path, `./qx.toml`, then `<config dir>/qx/config.toml`.
//! Without any file the defaults apply. `QX_DATABASE_URL` overrides `database.url`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QxError, QxResult};

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "QX_DATABASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl FromStr for Config {
    type Err = QxError;

    fn from_str(s: &str) -> QxResult<Self> {
        toml::from_str(s).map_err(|e| QxError::Config(e.to_string()))
    }
}

impl Config {
    pub fn from_path(path: &Path) -> QxResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| QxError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Files searched when no explicit path is given, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("qx.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("qx").join("config.toml"));
        }
        paths
    }

    /// Load from `explicit` or the first existing search path, then apply the
    /// environment override.
    pub fn load(explicit: Option<&Path>) -> QxResult<Self> {
        let config = match explicit {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_path(path)?
            }
            None => match Self::search_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading config");
                    Self::from_path(&path)?
                }
                None => {
                    tracing::debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        Ok(config.with_database_url(std::env::var(DATABASE_URL_ENV).ok()))
    }

    /// Replace the database URL when `url` is set and non-empty.
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.database.url = Some(url);
        }
        self
    }

    pub fn to_toml(&self) -> QxResult<String> {
        toml::to_string_pretty(self).map_err(|e| QxError::Config(e.to_string()))
    }
}
