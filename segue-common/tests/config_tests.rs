//! Tests for config file loading and data folder resolution
//!
//! Tests that manipulate SEGUE_TEST_DATA_FOLDER are marked #[serial] so they
//! never observe each other's environment.

use segue_common::config::{
    default_data_folder, resolve_data_folder, resolve_port, TomlConfig, DEFAULT_PORT,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const ENV_VAR: &str = "SEGUE_TEST_DATA_FOLDER";

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = TomlConfig::load(&dir.path().join("nope.toml")).unwrap();
    assert!(config.data_folder.is_none());
    assert!(config.server.port.is_none());
}

#[test]
fn test_config_file_parsed() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "data_folder = \"/srv/segue\"\n\n[server]\nport = 6000\n",
    )?;

    let config = TomlConfig::load(&path)?;
    assert_eq!(config.data_folder, Some(PathBuf::from("/srv/segue")));
    assert_eq!(config.server.port, Some(6000));
    Ok(())
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "data_folder = [unterminated").unwrap();
    assert!(TomlConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ENV_VAR, "/tmp/from-env");
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let folder = resolve_data_folder(Some(Path::new("/tmp/from-cli")), ENV_VAR, &toml);
    assert_eq!(folder, PathBuf::from("/tmp/from-cli"));
    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ENV_VAR, "/tmp/from-env");
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    assert_eq!(
        resolve_data_folder(None, ENV_VAR, &toml),
        PathBuf::from("/tmp/from-env")
    );
    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_falls_back_to_toml_then_default() {
    env::remove_var(ENV_VAR);
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    assert_eq!(
        resolve_data_folder(None, ENV_VAR, &toml),
        PathBuf::from("/tmp/from-toml")
    );
    assert_eq!(
        resolve_data_folder(None, ENV_VAR, &TomlConfig::default()),
        default_data_folder()
    );
}

#[test]
fn test_port_resolution() {
    let mut toml = TomlConfig::default();
    assert_eq!(resolve_port(None, &toml), DEFAULT_PORT);
    toml.server.port = Some(7000);
    assert_eq!(resolve_port(None, &toml), 7000);
    assert_eq!(resolve_port(Some(7100), &toml), 7100);
}
