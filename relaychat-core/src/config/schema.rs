//! Configuration schema structures with serde support

use super::error::ValidationError;
use super::secrets::{SafeLogging, SecretString};
use crate::http::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default provider endpoint root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Root configuration structure for the relay
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Inbound HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream model provider
    pub provider: ProviderConfig,

    /// Keyword model routing
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Prompt assembly for the plain chat endpoint
    #[serde(default)]
    pub chat: ChatConfig,

    /// Retrieval-augmented endpoint settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Retry policy for establishing the upstream response
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl RelayConfig {
    /// Build a configuration from defaults, reading only the credential from
    /// the environment
    pub fn from_env() -> Result<Self, super::ConfigError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| super::ConfigError::MissingEnvVar {
            var: API_KEY_ENV.to_string(),
        })?;
        Ok(Self::with_api_key(api_key))
    }

    /// Build a default configuration around an explicit credential
    pub fn with_api_key(api_key: impl Into<SecretString>) -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::new(api_key),
            routing: RoutingConfig::default(),
            chat: ChatConfig::default(),
            retrieval: RetrievalConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Structural validation that does not depend on external state
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider.api_key.is_empty() {
            return Err(ValidationError::missing("provider.api_key"));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(ValidationError::missing("provider.base_url"));
        }
        if self.routing.instruct_model.trim().is_empty() {
            return Err(ValidationError::missing("routing.instruct_model"));
        }
        if self.routing.general_model.trim().is_empty() {
            return Err(ValidationError::missing("routing.general_model"));
        }
        if self.routing.keywords.iter().any(|k| k.is_empty()) {
            return Err(ValidationError::invalid(
                "routing.keywords",
                "non-empty keywords",
                "an empty string",
            ));
        }
        Ok(())
    }
}

impl SafeLogging for RelayConfig {
    fn safe_for_logging(&self) -> String {
        format!(
            "bind={}, {}, models=({}, {}), mode={:?}, retrieval={}",
            self.server.bind,
            self.provider.safe_for_logging(),
            self.routing.instruct_model,
            self.routing.general_model,
            self.chat.mode,
            self.retrieval
                .documents_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "disabled".to_string())
        )
    }
}

/// Inbound HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Upstream provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API credential (supports `${VAR}` interpolation)
    pub api_key: SecretString,

    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP/TLS connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout for blocking calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum silence between two upstream chunks while streaming
    #[serde(default = "default_idle_timeout")]
    pub stream_idle_timeout_secs: u64,

    /// Upper bound on a single unterminated event-stream line
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl ProviderConfig {
    /// Create a provider configuration with default endpoint and timeouts
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            stream_idle_timeout_secs: default_idle_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

impl SafeLogging for ProviderConfig {
    fn safe_for_logging(&self) -> String {
        format!(
            "provider(base_url={}, api_key={}, connect={}s, request={}s, idle={}s)",
            self.base_url,
            self.api_key.hint(),
            self.connect_timeout_secs,
            self.request_timeout_secs,
            self.stream_idle_timeout_secs
        )
    }
}

/// Keyword routing between the instruct and general models
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Model used when any keyword matches
    #[serde(default = "default_instruct_model")]
    pub instruct_model: String,

    /// Model used otherwise
    #[serde(default = "default_general_model")]
    pub general_model: String,

    /// Case-sensitive substrings that select the instruct model
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            instruct_model: default_instruct_model(),
            general_model: default_general_model(),
            keywords: default_keywords(),
        }
    }
}

/// How the plain chat endpoint talks to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// One request/response call replayed as a single chunk
    #[default]
    Blocking,
    /// Incremental event-stream relay
    Streaming,
}

/// Prompt assembly for the plain chat endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// System prompt prepended to every upstream request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Upstream call style for `/chat`
    #[serde(default)]
    pub mode: ChatMode,

    /// Forward the whole conversation instead of only the latest user turn
    #[serde(default)]
    pub forward_history: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            mode: ChatMode::default(),
            forward_history: false,
        }
    }
}

/// Retrieval-augmented endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Joined context shorter than this (in characters) short-circuits the call
    #[serde(default = "default_min_context_chars")]
    pub min_context_chars: usize,

    /// JSON or YAML file of documents for the built-in retriever
    #[serde(default)]
    pub documents_path: Option<PathBuf>,

    /// Maximum number of documents returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_context_chars: default_min_context_chars(),
            documents_path: None,
            top_k: default_top_k(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_max_frame_bytes() -> usize {
    1024 * 1024
}

fn default_instruct_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_general_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_keywords() -> Vec<String> {
    vec!["step-by-step".to_string(), "instructions".to_string()]
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_min_context_chars() -> usize {
    50
}

fn default_top_k() -> usize {
    4
}
