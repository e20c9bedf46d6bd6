//! Configuration model

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RetraceError, RetraceResult};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetraceConfig {
    /// Project every session and config version belongs to
    pub project: String,
    /// Base URL of a remote record/config service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer token for the remote service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upper bound on replay-set fetches during session start
    #[serde(with = "humantime_serde", default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for RetraceConfig {
    fn default() -> Self {
        Self {
            project: "default".to_string(),
            endpoint: None,
            api_key: None,
            storage: StorageConfig::default(),
            fetch_timeout: default_fetch_timeout(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RetraceConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage.root = Some(root.into());
        self
    }

    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.storage.backend = backend;
        self
    }

    /// Check internal consistency; called after every load
    pub fn validate(&self) -> RetraceResult<()> {
        if self.project.trim().is_empty() {
            return Err(RetraceError::config("project must not be empty"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(RetraceError::config("fetch_timeout must be positive"));
        }
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(RetraceError::config_with_context(
                format!("unknown log level '{}'", self.logging.level),
                format!("expected one of {}", LEVELS.join(", ")),
            ));
        }
        const FORMATS: &[&str] = &["pretty", "compact", "json"];
        if !FORMATS.contains(&self.logging.format.as_str()) {
            return Err(RetraceError::config_with_context(
                format!("unknown log format '{}'", self.logging.format),
                format!("expected one of {}", FORMATS.join(", ")),
            ));
        }
        Ok(())
    }
}

/// Which store backend local sessions use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the file backend; `~` expands. Defaults to
    /// `~/.retrace`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    /// The effective root directory for file-backed storage
    pub fn resolve_root(&self) -> PathBuf {
        match &self.root {
            Some(root) => {
                let expanded = shellexpand::tilde(&root.to_string_lossy()).into_owned();
                PathBuf::from(expanded)
            }
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".retrace"),
        }
    }
}

/// Logging configuration; consumed by whichever binary installs the
/// subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RetraceConfig::default();
        assert_eq!(config.project, "default");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.storage.backend, StorageBackend::File);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RetraceConfig::new("  ");
        assert!(config.validate().is_err());

        config = RetraceConfig::new("proj");
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config = RetraceConfig::new("proj");
        config.fetch_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_root_tilde_expansion() {
        let config = StorageConfig {
            backend: StorageBackend::File,
            root: Some(PathBuf::from("~/captures")),
        };
        let resolved = config.resolve_root();
        assert!(!resolved.to_string_lossy().contains('~'));
        assert!(resolved.ends_with("captures"));
    }

    #[test]
    fn test_fetch_timeout_accepts_humantime_strings() {
        let config: RetraceConfig =
            serde_json::from_str(r#"{"project": "proj", "fetch_timeout": "250ms"}"#).unwrap();
        assert_eq!(config.fetch_timeout, Duration::from_millis(250));
    }
}
