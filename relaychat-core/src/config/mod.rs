//! Configuration module for the relay
//!
//! Configuration is loaded once at startup and handed to the relay by value;
//! nothing below the loader reads the process environment.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::interpolate_env_vars;
pub use error::{ConfigError, ConfigFormat, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ChatConfig, ChatMode, ProviderConfig, RelayConfig, RetrievalConfig, RoutingConfig,
    ServerConfig, API_KEY_ENV, DEFAULT_BASE_URL,
};
pub use secrets::{SafeLogging, SecretString};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    load(path.as_ref(), ConfigFormat::Yaml)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    load(path.as_ref(), ConfigFormat::Json)
}

/// Load a configuration file, choosing the format from its extension
pub fn load_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let config = read_from_path(path)?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Read and parse a configuration file without validating it
///
/// For callers that adjust the settings before running `ConfigValidator`
/// themselves.
pub fn read_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    parse(path, format)
}

fn load(path: &Path, format: ConfigFormat) -> ConfigResult<RelayConfig> {
    let config = parse(path, format)?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Read, interpolate `${VAR}` references, then parse
fn parse(path: &Path, format: ConfigFormat) -> ConfigResult<RelayConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = env::interpolate_env_vars(&content)?;

    let parse_error = |line, column, message| ConfigError::Parse {
        path: path.to_path_buf(),
        format,
        line,
        column,
        message,
    };
    let config: RelayConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| {
            let location = e.location();
            parse_error(
                location.as_ref().map(|l| l.line()),
                location.as_ref().map(|l| l.column()),
                e.to_string(),
            )
        })?,
        ConfigFormat::Json => serde_json::from_str(&content)
            .map_err(|e| parse_error(Some(e.line()), Some(e.column()), e.to_string()))?,
    };

    Ok(config)
}
