//! Engine configuration, loaded from TOML.
//!
//! Every section is optional; missing keys take their defaults, and a missing
//! file means an all-default config.

use crate::query::SchedulerConfig;
use crate::recent::DEFAULT_RECENT_KEY;
use crate::usage::gb_to_bytes;
use directories::ProjectDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_DEBOUNCE_MS: u64 = 60_000;

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
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub recent: RecentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before a submitted query runs.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    /// Total vault capacity in GB (1 GB = 1024³ bytes).
    pub capacity_gb: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { capacity_gb: 15.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecentBackend {
    #[default]
    Memory,
    Sqlite,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecentConfig {
    pub backend: RecentBackend,
    /// Directory for the sqlite/file backends. Defaults to the platform data dir.
    pub path: Option<String>,
    pub key: String,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            backend: RecentBackend::default(),
            path: None,
            key: DEFAULT_RECENT_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or from the platform config dir when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.clone(), source },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.storage.capacity_gb.is_finite() || self.storage.capacity_gb < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "storage.capacity_gb must be a non-negative number, got {}",
                self.storage.capacity_gb
            )));
        }
        if self.search.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Invalid(format!(
                "search.debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                self.search.debounce_ms
            )));
        }
        if self.recent.key.trim().is_empty() {
            return Err(ConfigError::Invalid("recent.key must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce: Duration::from_millis(self.search.debounce_ms),
        }
    }

    pub fn capacity_bytes(&self) -> u64 {
        gb_to_bytes(self.storage.capacity_gb)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "docvault", "docvault")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Where the sqlite/file recent-search stores live by default.
pub fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".docvault"))
}

/// JSON schema of the config file, pretty-printed.
pub fn config_schema() -> String {
    let schema = schemars::schema_for!(EngineConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.scheduler().debounce, Duration::from_millis(300));
        assert_eq!(config.capacity_bytes(), 15 * 1024 * 1024 * 1024);
        assert_eq!(config.recent.key, "recent-searches");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [storage]
            capacity_gb = 2.5

            [recent]
            backend = "sqlite"
            path = "/tmp/docvault"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(config.capacity_bytes(), 2 * 1024 * 1024 * 1024 + 512 * 1024 * 1024);
        assert_eq!(config.recent.backend, RecentBackend::Sqlite);
        assert_eq!(config.recent.key, "recent-searches");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml("[storage]\ncapacity_gb = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[search]\ndebounce_ms = 999999"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[recent]\nbackend = \"redis\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\ndebounce_ms = 120\n").unwrap();
        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.search.debounce_ms, 120);
    }

    #[test]
    fn schema_mentions_sections() {
        let schema = config_schema();
        assert!(schema.contains("capacity_gb"));
        assert!(schema.contains("debounce_ms"));
    }
}
