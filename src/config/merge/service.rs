//! MergeService: orchestrates sources, applies merge policy, deserializes to MrConfig.

use super::builder_with_defaults;
use crate::config::sources::{environment, file};
use crate::config::MrConfig;
use config::ConfigError;
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> optional file -> environment (highest).
    pub fn load(optional_file: Option<&Path>) -> Result<MrConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = match optional_file {
            Some(path) => file::add_to_builder(builder, path, false)?,
            None => builder,
        };
        let builder = environment::add_to_builder(builder)?;
        builder.build()?.try_deserialize()
    }

    /// Load config from a file that must exist, with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<MrConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = file::add_to_builder(builder, path, true)?;
        let builder = environment::add_to_builder(builder)?;
        builder.build()?.try_deserialize()
    }
}
