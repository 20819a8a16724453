use super::view::SendRejected;
use thiserror::Error;

/// Client-side failures while sending a turn or reading its reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    #[error("cannot send: {0}")]
    Rejected(#[from] SendRejected),

    #[error("invalid server url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reply stream interrupted: {0}")]
    Read(String),
}

impl ConsumerError {
    /// Whether the failure happened after the reply started
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, ConsumerError::Read(_))
    }
}

impl From<reqwest::Error> for ConsumerError {
    fn from(err: reqwest::Error) -> Self {
        ConsumerError::Transport(err.to_string())
    }
}
