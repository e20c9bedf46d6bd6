//! File-based configuration loading

use std::fs;
use std::path::Path;

use crate::config::model::RetraceConfig;
use crate::error::{RetraceError, RetraceResult};

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if the file doesn't exist.
pub fn load_from_file(path: &Path) -> RetraceResult<RetraceConfig> {
    if !path.exists() {
        return Ok(RetraceConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        RetraceError::config_with_context(
            format!("failed to read config file: {}", e),
            path.display().to_string(),
        )
    })?;

    let config: RetraceConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            RetraceError::config_with_context(
                format!("failed to parse TOML config: {}", e),
                path.display().to_string(),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            RetraceError::config_with_context(
                format!("failed to parse YAML config: {}", e),
                path.display().to_string(),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            RetraceError::config_with_context(
                format!("failed to parse JSON config: {}", e),
                path.display().to_string(),
            )
        })?,
    };

    Ok(config)
}
