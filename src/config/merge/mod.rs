//! Merge policy: defaults first, every later source overrides earlier ones.

pub mod service;

use crate::config::MrConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the serialised defaults of `MrConfig`
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&MrConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
