//! Engine configuration
//!
//! Loaded from a JSON file. Every field has a default so an empty object is
//! a valid single-partition configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Host-level settings shared by every partition engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Partitions (sites) running on this host; the barrier waits for all of them
    #[serde(default = "default_sites_per_host")]
    pub sites_per_host: usize,

    /// Upper bound on a barrier wait. `None` waits indefinitely.
    #[serde(default)]
    pub barrier_wait_timeout_ms: Option<u64>,

    /// Bytes per partition arena, 0 = unlimited
    #[serde(default)]
    pub temp_table_memory_limit: usize,

    #[serde(default)]
    pub host_id: i32,

    #[serde(default = "default_hostname")]
    pub hostname: String,

    #[serde(default)]
    pub dr_cluster_id: i32,

    /// TRACE, INFO, WARN, ERROR or FATAL
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sites_per_host() -> usize {
    1
}
fn default_hostname() -> String {
    "localhost".to_string()
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sites_per_host: default_sites_per_host(),
            barrier_wait_timeout_ms: None,
            temp_table_memory_limit: 0,
            host_id: 0,
            hostname: default_hostname(),
            dr_cluster_id: 0,
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Config for `sites` partitions with every other field defaulted
    pub fn with_sites(sites: usize) -> Self {
        Self {
            sites_per_host: sites,
            ..Self::default()
        }
    }

    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("sites_per_host", &config.sites_per_host.to_string()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.sites_per_host == 0 {
            return Err(ConfigError::Invalid("sites_per_host must be >= 1".into()));
        }
        if self.barrier_wait_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "barrier_wait_timeout_ms must be > 0 when set".into(),
            ));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    pub fn barrier_wait_timeout(&self) -> Option<Duration> {
        self.barrier_wait_timeout_ms.map(Duration::from_millis)
    }

    /// Applies `log_level` to the process-wide logger
    pub fn apply_logging(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.sites_per_host, 1);
        assert!(config.barrier_wait_timeout().is_none());
    }

    #[test]
    fn test_zero_sites_rejected() {
        let err = EngineConfig::from_json_str(r#"{"sites_per_host":0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"log_level":"loud"}"#).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"barrier_wait_timeout_ms":0}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sites_per_host":4,"barrier_wait_timeout_ms":250,"hostname":"node-a"}}"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.sites_per_host, 4);
        assert_eq!(config.barrier_wait_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.hostname, "node-a");
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
