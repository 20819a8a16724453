//! Relay error types
//!
//! Transport and status failures abort a request. Frame-level decode
//! failures never reach this type: the frame decoder logs them and carries on.

use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while relaying a chat request to the provider
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Connection or transport failure talking to the provider
    #[error("Network error: {message}")]
    Network { message: String },

    /// The provider did not answer (or stalled mid-stream) within the configured window
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The provider answered with a non-2xx status
    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// A single unterminated line grew past the frame size limit
    #[error("Upstream frame exceeded {limit} bytes without a line terminator")]
    FrameTooLarge { limit: usize },

    /// A blocking-mode response body could not be decoded
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// The conversation holds no message with role `user`
    #[error("Conversation contains no user message")]
    MissingUserMessage,

    /// The retrieval collaborator failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The relay was constructed with unusable settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RelayError {
    /// Whether establishing the upstream response may be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            Self::FrameTooLarge { .. }
            | Self::Decode(_)
            | Self::MissingUserMessage
            | Self::Retrieval(_)
            | Self::Configuration(_) => false,
        }
    }

    /// HTTP status the inbound endpoint should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingUserMessage => 400,
            Self::Timeout { .. } => 504,
            Self::Network { .. }
            | Self::UpstreamStatus { .. }
            | Self::FrameTooLarge { .. }
            | Self::Decode(_) => 502,
            Self::Retrieval(_) | Self::Configuration(_) => 500,
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Decode(err.to_string())
    }
}
