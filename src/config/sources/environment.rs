//! Environment variable source: MRTOOLS_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// `MRTOOLS_MAX_TREE_DEPTH=8`, `MRTOOLS_LOGGING__LEVEL=debug`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("MRTOOLS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    ))
}
