//! Configuration
//!
//! `MrConfig` is assembled from built-in defaults, an optional TOML file and
//! `MRTOOLS_*` environment variables (nested keys use `__`).

pub mod facade;
pub mod merge;
pub mod sources;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::tree::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use facade::ConfigLoader;

/// Runtime configuration of the reliability tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrConfig {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Deepest level below a sheet at which nodes may still be added
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,

    /// Lines shown per entry in report previews
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,

    /// Characters of a description shown in previews
    #[serde(default = "default_max_chars_description")]
    pub max_chars_description: usize,

    /// Seed the default domain rules when installing
    #[serde(default = "default_true")]
    pub seed_domain_defaults: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database() -> PathBuf {
    PathBuf::from("mrtools.sqlite3")
}

fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_preview_lines() -> usize {
    5
}

fn default_max_chars_description() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Default for MrConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            max_tree_depth: default_max_tree_depth(),
            preview_lines: default_preview_lines(),
            max_chars_description: default_max_chars_description(),
            seed_domain_defaults: default_true(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MrConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.database.as_os_str().is_empty() {
            return Err(ApiError::ConfigError("database path is empty".to_string()));
        }
        if self.max_tree_depth == 0 {
            return Err(ApiError::ConfigError(
                "max_tree_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
