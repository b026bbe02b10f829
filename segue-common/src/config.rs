//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default HTTP port for the player service
pub const DEFAULT_PORT: u16 = 5780;

/// `[server]` table of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

/// Contents of the optional `config.toml`
///
/// Every key is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub data_folder: Option<PathBuf>,
    /// Folder relative track paths resolve against
    pub library_root: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
}

impl TomlConfig {
    /// Load a config file. A missing file logs a warning and yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Platform config file location (`<config_dir>/segue/config.toml`)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("segue").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Data folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `data_folder` key of the TOML config file
/// 4. OS-dependent default
pub fn resolve_data_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("segue"))
        .unwrap_or_else(|| PathBuf::from("./segue_data"))
}

/// Resolve the HTTP port: CLI/env value wins over the config file
pub fn resolve_port(cli_port: Option<u16>, toml: &TomlConfig) -> u16 {
    cli_port.or(toml.server.port).unwrap_or(DEFAULT_PORT)
}
