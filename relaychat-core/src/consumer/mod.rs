//! Client side of the relay
//!
//! Sends a conversation to a relay server and renders the reply as it
//! arrives. The reply body is raw UTF-8 text with no framing, so the only
//! decoding needed is stateful UTF-8 across chunk boundaries.

pub mod decoder;
pub mod error;
pub mod session;
pub mod transport;
pub mod view;

pub use decoder::Utf8StreamDecoder;
pub use error::ConsumerError;
pub use session::{ChatSession, StreamConsumer};
pub use transport::{ChatTransport, Endpoint, HttpTransport, ReplyStream};
pub use view::{ConversationView, SendRejected, APOLOGY_MESSAGE};
