//! Config and database location on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::types::Config;

/// `~/.peerlog`
pub fn data_dir() -> Result<PathBuf, PipelineError> {
    let home = dirs::home_dir()
        .ok_or_else(|| PipelineError::Config("Could not find home directory".to_string()))?;
    Ok(home.join(".peerlog"))
}

pub fn config_path() -> Result<PathBuf, PipelineError> {
    Ok(data_dir()?.join("config.json"))
}

/// Load `~/.peerlog/config.json`, falling back to defaults when it does not exist.
pub fn load_config() -> Result<Config, PipelineError> {
    let path = config_path()?;
    if !path.exists() {
        log::info!(
            "No config at {}; using defaults",
            path.display()
        );
        return Ok(Config::default());
    }
    load_config_from(&path)
}

/// Load and validate a config file at an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config, PipelineError> {
    let content = fs::read_to_string(path)
        .map_err(|e| PipelineError::Config(format!("Failed to read config: {}", e)))?;

    let config: Config = serde_json::from_str(&content)
        .map_err(|e| PipelineError::Config(format!("Failed to parse config: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Database file named by the config, or `~/.peerlog/peerlog.db`.
pub fn database_path(config: &Config) -> Result<PathBuf, PipelineError> {
    match config.database_path.as_deref() {
        Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p)),
        _ => Ok(data_dir()?.join("peerlog.db")),
    }
}
