use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "MEDIARELAY_";

/// Variable naming the config file; not itself a config key.
pub const CONFIG_PATH_VAR: &str = "MEDIARELAY_CONFIG";

/// Load configuration from file with environment variable overrides.
///
/// Variables use a double underscore between sections, e.g.
/// `MEDIARELAY_TELEGRAM__BOT_TOKEN`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn env_overrides() -> Env {
    let path_key = CONFIG_PATH_VAR.trim_start_matches(ENV_PREFIX).to_lowercase();
    Env::prefixed(ENV_PREFIX)
        .ignore(&[path_key.as_str()])
        .split("__")
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
