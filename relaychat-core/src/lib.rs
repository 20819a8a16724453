//! Relaychat Core Library
//!
//! Protocol types, configuration, the upstream HTTP client and the
//! incremental response relay behind the relaychat server, plus the client
//! side stream consumer.

pub mod config;
pub mod consumer;
pub mod error;
pub mod http;
pub mod protocol;
pub mod relay;

pub use config::{load_from_path, ChatMode, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use protocol::{ChatMessage, MessageRole};
pub use relay::{ChatRelay, TextStream};

/// Returns the version of the Relaychat Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
