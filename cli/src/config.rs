use crate::storage::resolve_data_dir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persistent CLI settings, stored as TOML next to the document store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// The user id commands act as. Set by `user create` and `user use`.
    pub active_user: Option<String>,
}

impl Config {
    pub fn load(config_dir: Option<&str>) -> Result<Self> {
        let path = Self::path(config_dir)?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file at {}", path.display()))
    }

    pub fn save(&self, config_dir: Option<&str>) -> Result<()> {
        let path = Self::path(config_dir)?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    fn path(config_dir: Option<&str>) -> Result<PathBuf> {
        Ok(resolve_data_dir(config_dir)?.join("config.toml"))
    }
}
