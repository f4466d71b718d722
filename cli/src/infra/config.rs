//! Infrastructure implementation of the `SettingsStore` port, and loading of
//! cluster configuration files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kindle_common::ClusterConfig;

use crate::application::ports::SettingsStore;
use crate::domain::config::KindleSettings;

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "KINDLE_CONFIG";

/// Production implementation of `SettingsStore` that reads a YAML file.
///
/// Without an explicit path the file is `$KINDLE_CONFIG` or
/// `~/.kindle/config.yaml`.
#[derive(Debug, Default)]
pub struct YamlSettingsStore {
    path: Option<PathBuf>,
}

impl YamlSettingsStore {
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl SettingsStore for YamlSettingsStore {
    fn load(&self) -> Result<KindleSettings> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(KindleSettings::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(SETTINGS_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".kindle").join("config.yaml"))
    }
}

/// Read and parse a cluster configuration file.
pub fn load_cluster_config(path: &Path) -> Result<ClusterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read cluster config {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse cluster config {}", path.display()))
}
