//! Checks that need more than serde: URLs, addresses, ranges

use super::env::contains_placeholder;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::RelayConfig;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

/// Smallest accepted `provider.max_frame_bytes`
const MIN_FRAME_BYTES: usize = 1024;

/// Validates a parsed `RelayConfig` before a relay is built from it
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run the schema's own checks, then the rules below, stopping at the
    /// first failure
    pub fn validate(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.check_placeholders(config)?;
        self.check_provider(config)?;
        self.check_bind(config)?;
        self.check_keywords(config)?;

        if config.retrieval.top_k == 0 {
            return Err(ValidationError::out_of_range("retrieval.top_k", "must be at least 1"));
        }
        Ok(())
    }

    fn check_placeholders(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let fields = [
            ("provider.api_key", config.provider.api_key.expose_secret()),
            ("provider.base_url", config.provider.base_url.as_str()),
        ];
        match fields.into_iter().find(|(_, value)| contains_placeholder(value)) {
            Some((field, _)) => Err(ValidationError::new(
                field,
                ValidationErrorKind::UnresolvedPlaceholder,
            )),
            None => Ok(()),
        }
    }

    fn check_provider(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let provider = &config.provider;

        let url = Url::parse(&provider.base_url).map_err(|e| {
            ValidationError::new("provider.base_url", ValidationErrorKind::InvalidUrl(e.to_string()))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::new(
                "provider.base_url",
                ValidationErrorKind::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())),
            ));
        }

        for (field, secs) in [
            ("provider.connect_timeout_secs", provider.connect_timeout_secs),
            ("provider.request_timeout_secs", provider.request_timeout_secs),
            ("provider.stream_idle_timeout_secs", provider.stream_idle_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ValidationError::out_of_range(field, "must be at least 1 second"));
            }
        }

        if provider.max_frame_bytes < MIN_FRAME_BYTES {
            return Err(ValidationError::out_of_range(
                "provider.max_frame_bytes",
                format!("{} is below {}", provider.max_frame_bytes, MIN_FRAME_BYTES),
            ));
        }

        Ok(())
    }

    fn check_bind(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let bind = &config.server.bind;
        bind.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
            ValidationError::invalid("server.bind", "a socket address such as 127.0.0.1:3000", bind)
                .with_detail(e.to_string())
        })
    }

    fn check_keywords(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        match config.routing.keywords.iter().find(|k| !seen.insert(k.as_str())) {
            Some(duplicate) => Err(ValidationError::invalid(
                "routing.keywords",
                "unique keywords",
                format!("'{}' twice", duplicate),
            )),
            None => Ok(()),
        }
    }
}
