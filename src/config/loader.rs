// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PackpipeError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        PackpipeError::ConfigError(format!("cannot read {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the raw configuration for a run.
///
/// - An explicit path must exist and parse.
/// - Otherwise [`default_config_path`] is used if present.
/// - Otherwise built-in defaults apply.
///
/// The result is still raw so CLI flags can be layered on top before
/// validation.
pub fn load_raw_or_default(explicit: Option<&Path>) -> Result<RawConfigFile> {
    if let Some(path) = explicit {
        debug!(config = %path.display(), "loading config file");
        return load_from_path(path);
    }

    let default = default_config_path();
    if default.is_file() {
        debug!(config = %default.display(), "loading default config file");
        return load_from_path(&default);
    }

    debug!("no config file; using built-in defaults");
    Ok(RawConfigFile::default())
}

/// `Packpipe.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Packpipe.toml")
}
