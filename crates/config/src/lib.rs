//! Configuration file handling for mailpurge
//!
//! Resolves and loads JSON files from the shared mailpurge config
//! directory (~/.config/mailpurge/). Both the run options and the stored
//! IMAP credentials live there.
//!
//! Call [`init`] at application startup to bootstrap the config directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the directory under the platform config dir
const APP_DIR: &str = "mailpurge";

/// Initialize the mailpurge config directory.
///
/// Creates ~/.config/mailpurge/ if it doesn't exist.
/// Call this once at application startup.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the mailpurge config directory (~/.config/mailpurge/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to a config file within the mailpurge config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Load and parse a JSON config file from the mailpurge config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load a JSON file from the config directory if it exists.
///
/// Returns `Ok(None)` when the file is absent so callers can fall back
/// to built-in defaults without treating that as an error.
pub fn load_json_if_exists<T: DeserializeOwned>(filename: &str) -> Result<Option<T>> {
    if !config_exists(filename) {
        return Ok(None);
    }
    load_json(filename).map(Some)
}

/// Check if a config file exists in the mailpurge config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Ensure the mailpurge config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}
