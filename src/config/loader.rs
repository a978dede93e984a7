// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::{EngineError, Result};

/// Read and deserialize a config file.
///
/// This only performs TOML deserialization; it does not run semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| EngineError::fs(path, e))?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a config file and run semantic validation over it.
///
/// This is the entry point the rest of the application uses: it reads the
/// TOML, applies serde defaults, and checks reference and cycle invariants
/// so later assembly cannot trip over a malformed config.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Default config path in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Buildpipe.toml")
}
