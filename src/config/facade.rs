//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::MrConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Per-user config file (`<config dir>/mrtools/config.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mrtools")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from defaults, an optional file and the environment.
    /// Without an explicit file the per-user file is used when it exists.
    pub fn load(file: Option<&Path>) -> Result<MrConfig, ConfigError> {
        match file {
            Some(path) => MergeService::load_from_file(path),
            None => MergeService::load(Self::user_config_path().as_deref()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<MrConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> MrConfig {
        MrConfig::default()
    }
}
