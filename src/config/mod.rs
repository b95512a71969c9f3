//! Configuration loading.
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file (any format the `config` crate recognises by extension), then
//! environment variables prefixed `PUSHSUB_` with `__` between nested keys,
//! e.g. `PUSHSUB_SUBSCRIBER__RETRY_COUNT=5`.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerSettings, LogSettings, MessageSettings, ServerSettings, Settings, SubscriberSettings,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Same as [`load_config`] with an explicit file path (extension optional).
/// A missing file is not an error.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("PUSHSUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

#[cfg(test)]
mod tests;
