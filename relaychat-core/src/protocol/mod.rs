//! Protocol module for chat request/response structures
//!
//! Conversations arrive from the client as `ChatMessage` arrays and leave
//! for the provider as `ChatCompletionRequest` bodies.

pub mod types;

pub use types::{
    latest_user_message, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, MessageRole,
    ResponseChoice, ResponseMessage, StreamChoice, StreamChunk, StreamDelta,
};
