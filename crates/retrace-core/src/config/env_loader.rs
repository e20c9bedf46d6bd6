//! Environment variable overrides
//!
//! Every setting can be forced from the environment with a `RETRACE_`
//! prefix; set variables win over file values.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{RetraceConfig, StorageBackend};
use crate::error::{RetraceError, RetraceResult};

/// Apply `RETRACE_*` environment overrides on top of `config`
pub fn apply_env_overrides(config: &mut RetraceConfig) -> RetraceResult<()> {
    if let Ok(project) = env::var("RETRACE_PROJECT") {
        config.project = project;
    }
    if let Ok(endpoint) = env::var("RETRACE_ENDPOINT") {
        config.endpoint = Some(endpoint);
    }
    if let Ok(api_key) = env::var("RETRACE_API_KEY") {
        config.api_key = Some(api_key);
    }
    if let Ok(backend) = env::var("RETRACE_STORAGE_BACKEND") {
        config.storage.backend = match backend.to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "file" => StorageBackend::File,
            other => {
                return Err(RetraceError::config(format!(
                    "invalid RETRACE_STORAGE_BACKEND value '{}'",
                    other
                )));
            }
        };
    }
    if let Ok(root) = env::var("RETRACE_STORAGE_ROOT") {
        config.storage.root = Some(PathBuf::from(root));
    }
    if let Ok(secs) = env::var("RETRACE_FETCH_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .map_err(|_| RetraceError::config("invalid RETRACE_FETCH_TIMEOUT_SECS value"))?;
        config.fetch_timeout = Duration::from_secs(secs);
    }
    if let Ok(level) = env::var("RETRACE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(format) = env::var("RETRACE_LOG_FORMAT") {
        config.logging.format = format;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env manipulation is process-global, so everything runs in one test.
    #[test]
    fn test_env_overrides() {
        unsafe {
            env::set_var("RETRACE_PROJECT", "from-env");
            env::set_var("RETRACE_ENDPOINT", "http://env:4000");
            env::set_var("RETRACE_STORAGE_BACKEND", "memory");
            env::set_var("RETRACE_FETCH_TIMEOUT_SECS", "9");
        }
        let mut config = RetraceConfig::default();
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.project, "from-env");
        assert_eq!(config.endpoint.as_deref(), Some("http://env:4000"));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.fetch_timeout, Duration::from_secs(9));

        unsafe {
            env::set_var("RETRACE_STORAGE_BACKEND", "punchcards");
        }
        let mut config = RetraceConfig::default();
        assert!(apply_env_overrides(&mut config).is_err());

        unsafe {
            env::remove_var("RETRACE_PROJECT");
            env::remove_var("RETRACE_ENDPOINT");
            env::remove_var("RETRACE_STORAGE_BACKEND");
            env::remove_var("RETRACE_FETCH_TIMEOUT_SECS");
        }
    }
}
