//! segue-player configuration
//!
//! Bootstrap settings come from the command line, environment and an
//! optional TOML file; runtime tunables (fade length, crossfade) live in the
//! database `settings` table.

use crate::error::Result;
use clap::Parser;
use segue_common::config::{default_config_path, resolve_data_folder, resolve_port, TomlConfig};
use std::path::PathBuf;
use tracing::info;

/// Environment variable naming the data folder
pub const DATA_FOLDER_ENV: &str = "SEGUE_DATA_FOLDER";

/// Command-line arguments for segue-player
#[derive(Parser, Debug, Default)]
#[command(name = "segue-player")]
#[command(about = "Playback queue and crossfade engine with an HTTP control API")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SEGUE_PORT")]
    pub port: Option<u16>,

    /// Folder holding the player database (env: SEGUE_DATA_FOLDER)
    #[arg(short, long)]
    pub data_folder: Option<PathBuf>,

    /// Folder relative track paths resolve against
    #[arg(short, long, env = "SEGUE_LIBRARY_ROOT")]
    pub library_root: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, env = "SEGUE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_folder: PathBuf,
    pub library_root: PathBuf,
}

impl Config {
    /// Resolve every setting: CLI, then environment, then config file, then defaults
    pub fn resolve(args: &Args) -> Result<Self> {
        let config_path = match &args.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let toml = TomlConfig::load(&config_path)?;
        Ok(Self::from_sources(args, &toml))
    }

    pub fn from_sources(args: &Args, toml: &TomlConfig) -> Self {
        let data_folder = resolve_data_folder(args.data_folder.as_deref(), DATA_FOLDER_ENV, toml);
        let library_root = args
            .library_root
            .clone()
            .or_else(|| toml.library_root.clone())
            .unwrap_or_else(|| data_folder.join("music"));

        Self {
            port: resolve_port(args.port, toml),
            data_folder,
            library_root,
        }
    }

    pub fn log_summary(&self) {
        info!("Port: {}", self.port);
        info!("Data folder: {}", self.data_folder.display());
        info!("Library root: {}", self.library_root.display());
    }
}
