//! Configuration: model, file loading, environment overrides

mod env_loader;
mod file_loader;
mod model;

pub use env_loader::apply_env_overrides;
pub use file_loader::load_from_file;
pub use model::{LoggingConfig, RetraceConfig, StorageBackend, StorageConfig};

use std::path::{Path, PathBuf};

use crate::error::RetraceResult;

const FILE_NAMES: &[&str] = &[
    "retrace.json",
    "retrace.toml",
    "retrace.yaml",
    "retrace.yml",
];

/// First config file found: `retrace.*` in the working directory, then
/// `config.*` under `~/.retrace`
pub fn default_config_path() -> Option<PathBuf> {
    for name in FILE_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }
    let home = dirs::home_dir()?.join(".retrace");
    for extension in ["json", "toml", "yaml", "yml"] {
        let path = home.join(format!("config.{}", extension));
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration: defaults, then the default config file if one
/// exists, then environment overrides, validated
pub fn load() -> RetraceResult<RetraceConfig> {
    let mut config = match default_config_path() {
        Some(path) => load_from_file(&path)?,
        None => RetraceConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit file, then environment overrides,
/// validated
pub fn load_with_file(path: &Path) -> RetraceResult<RetraceConfig> {
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}
