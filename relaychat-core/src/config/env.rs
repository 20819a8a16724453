//! Environment variable interpolation for configuration

use super::error::ConfigError;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Replace every `${VAR}` reference in `content` with the variable's value
///
/// The first missing variable is reported as `ConfigError::MissingEnvVar`.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    interpolate_with(content, |name| env::var(name).ok())
}

/// Interpolation against an arbitrary lookup, used by tests to avoid
/// touching the process environment
pub(crate) fn interpolate_with<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = None;
    let result = ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                if missing.is_none() {
                    missing = Some(name.to_string());
                }
                String::new()
            }
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnvVar { var });
    }

    Ok(result.into_owned())
}

/// Whether `value` still contains an unresolved `${VAR}` reference
pub fn contains_placeholder(value: &str) -> bool {
    ENV_VAR_PATTERN.is_match(value)
}
