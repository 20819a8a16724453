//! Upstream relay
//!
//! Turns a client conversation into a provider call and the provider's
//! event stream into plain text:
//! - `frame`: incremental `data: ` line decoder
//! - `stream`: pull-driven text stream over an upstream body
//! - `router`: keyword model selection
//! - `retrieval`: context lookup for the augmented endpoint
//! - `service`: the `ChatRelay` tying them together

pub mod frame;
pub mod retrieval;
pub mod router;
pub mod service;
pub mod stream;

pub use frame::{FrameDecoder, UpstreamFrame, DATA_PREFIX, DONE_SENTINEL};
pub use retrieval::{Document, Retriever, StaticRetriever, UNAVAILABLE_MESSAGE};
pub use router::ModelRouter;
pub use service::ChatRelay;
pub use stream::{one_shot, relay_text_stream, TextStream};
