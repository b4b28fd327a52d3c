use config::{Config, ConfigError};
use serde::de::DeserializeOwned;

pub static DEFAULT_SETTINGS_FILE: &str = "settings.toml";

/// Layers an optional settings file under `{env_prefix}__*` environment variables.
pub fn try_read_file_config<T, E>(file: &str, env_prefix: &str) -> Result<T, E>
where
    T: DeserializeOwned,
    E: From<ConfigError>,
{
    Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(config::Environment::with_prefix(env_prefix).separator("__"))
        .build()
        .and_then(Config::try_deserialize)
        .map_err(Into::into)
}

pub fn read_file_config_or_default<T>(file: &str, env_prefix: &str) -> T
where
    T: DeserializeOwned + Default,
{
    try_read_file_config::<T, ConfigError>(file, env_prefix)
        .map_err(|error| {
            tracing::warn!("config error: {error}, going on with default config...");
        })
        .unwrap_or_default()
}
