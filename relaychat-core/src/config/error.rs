//! Errors raised while loading and checking a relay configuration

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// File formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {format} in {}{}: {message}", .path.display(), location(.line, .column))]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("environment variable {var} is not set")]
    MissingEnvVar { var: String },

    #[error("unsupported config file {} (expected .yaml, .yml or .json)", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at {}:{}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A setting that parsed but cannot be used
#[derive(Debug, Error)]
#[error("{field} {kind}{}", detail_suffix(.detail))]
pub struct ValidationError {
    /// Dotted path of the offending setting, e.g. `provider.base_url`
    pub field: &'static str,
    pub kind: ValidationErrorKind,
    pub detail: Option<String>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(" ({})", detail))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("must be set")]
    Missing,

    #[error("expected {expected}, found {found}")]
    Invalid { expected: &'static str, found: String },

    #[error("is out of range: {0}")]
    OutOfRange(String),

    #[error("is not a usable URL: {0}")]
    InvalidUrl(String),

    #[error("still contains an unresolved ${{VAR}} placeholder")]
    UnresolvedPlaceholder,
}

impl ValidationError {
    pub fn new(field: &'static str, kind: ValidationErrorKind) -> Self {
        Self {
            field,
            kind,
            detail: None,
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, ValidationErrorKind::Missing)
    }

    pub fn invalid(field: &'static str, expected: &'static str, found: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::Invalid {
                expected,
                found: found.into(),
            },
        )
    }

    pub fn out_of_range(field: &'static str, message: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::OutOfRange(message.into()))
    }

    /// Attach the underlying parser message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("relay.yml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("relay.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("relay.toml")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("relay")), None);
    }

    #[test]
    fn test_validation_display() {
        let err = ValidationError::invalid("server.bind", "a socket address", "localhost")
            .with_detail("invalid socket address syntax");
        assert_eq!(
            err.to_string(),
            "server.bind expected a socket address, found localhost (invalid socket address syntax)"
        );
        assert_eq!(
            ValidationError::missing("provider.api_key").to_string(),
            "provider.api_key must be set"
        );
    }

    #[test]
    fn test_parse_display_includes_location() {
        let err = ConfigError::Parse {
            path: PathBuf::from("relay.yaml"),
            format: ConfigFormat::Yaml,
            line: Some(3),
            column: Some(7),
            message: "unknown field `temperature`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid YAML in relay.yaml at 3:7: unknown field `temperature`"
        );
    }
}
