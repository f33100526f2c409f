//! Configuration module for insight search
//!
//! Handles loading settings from YAML files and environment variables.
//! Settings are passed explicitly into the application state; there is no
//! process-wide settings instance.

mod settings;

pub use settings::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable pointing at an explicit settings file
pub const SETTINGS_PATH_ENV: &str = "INSIGHT_SETTINGS_PATH";

/// Load settings from the first settings file found, or defaults, then apply env overrides
pub fn load() -> Result<Settings> {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return load_file(&path);
        }
    }

    for path in default_paths() {
        if path.exists() {
            return load_file(&path);
        }
    }

    info!("No settings file found, using defaults");
    let mut settings = Settings::default();
    settings.merge_env();
    Ok(settings)
}

/// Load one settings file and apply env overrides
pub fn load_file(path: &Path) -> Result<Settings> {
    info!("Loading settings from: {}", path.display());
    let mut settings = Settings::from_file(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    settings.merge_env();
    Ok(settings)
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/insight-search/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("insight-search/settings.yml"));
    }
    paths
}
