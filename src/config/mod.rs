//! Configuration management for offtask

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `tasks.db` and `snapshots.db`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Origin the offline controller serves (requests elsewhere pass through)
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Offline cache settings
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Offline cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheSettings {
    /// Tag of the current snapshot; any other snapshot is stale
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Resources fetched into the snapshot at install time
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Activate as soon as installation finishes
    #[serde(default = "default_skip_waiting")]
    pub skip_waiting_on_install: bool,

    /// Network timeout; unset leaves it to the network stack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_cache_version() -> String {
    "pwa-v1".to_string()
}

fn default_precache() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_skip_waiting() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            precache: default_precache(),
            skip_waiting_on_install: default_skip_waiting(),
            request_timeout_secs: None,
        }
    }
}

impl CacheSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".offtask").join("config.yaml"))
    }

    /// Resolve the config path from an optional override
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an explicit path, or the default location.
    ///
    /// A missing explicit file is an error; a missing default file yields defaults.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(Path::new(p)),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(&default)
                } else {
                    log::debug!("No config at {}, using defaults", default.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Check that the origin parses and the snapshot tag is usable
    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;
        if self.cache.version.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.version must not be empty".to_string()).into());
        }
        Ok(())
    }

    /// Parsed origin URL
    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid(format!("origin '{}': {}", self.origin, e)).into())
    }

    /// Resolved data directory (~/.local/share/offtask on Linux)
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
            .ok_or(ConfigError::Invalid(
                "Could not determine data directory".to_string(),
            ))?;
        Ok(base.join("offtask"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            origin: default_origin(),
            cache: CacheSettings::default(),
        }
    }
}
