//! `casabot.json`: named provider credentials plus the active selection.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use casabot_agent::CasabotPaths;
use chat_api::ProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasabotConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub active_provider: String,
    #[serde(default)]
    pub base_model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no provider configured; add one to casabot.json")]
    NoProvider,
    #[error("active provider '{0}' not found")]
    ProviderNotFound(String),
}

impl CasabotConfig {
    /// The provider named by `activeProvider`, or the one flagged
    /// `isDefault` when no name is set.
    pub fn active_provider(&self) -> Result<&ProviderConfig, ConfigError> {
        let active = self.active_provider.trim();
        if active.is_empty() {
            return self
                .providers
                .iter()
                .find(|provider| provider.is_default)
                .ok_or(ConfigError::NoProvider);
        }
        self.provider_named(active)
    }

    pub fn provider_named(&self, name: &str) -> Result<&ProviderConfig, ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProvider);
        }
        self.providers
            .iter()
            .find(|provider| provider.name == name)
            .ok_or_else(|| ConfigError::ProviderNotFound(name.to_string()))
    }
}

/// Reads the config file. A missing file yields the default config.
pub fn load_config(path: &Path) -> Result<CasabotConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(CasabotConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `config` as pretty JSON after creating the home layout.
pub fn save_config(paths: &CasabotPaths, config: &CasabotConfig) -> Result<(), ConfigError> {
    let path = &paths.config_file;
    paths.ensure_directories().map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    let serialized = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, serialized).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })
}
