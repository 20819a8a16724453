//! Outbound HTTP to the model provider
//!
//! `HttpExecutor` is the seam between the relay and the network.
//! `HttpClient` implements it with a pooled reqwest client; tests substitute
//! their own executors.

pub mod client;
pub mod error;
pub mod retry;

use crate::error::RelayResult;
use crate::protocol::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use uuid::Uuid;

pub use client::HttpClient;
pub use retry::{RetryExecutor, RetryPolicy};

/// Raw upstream body, delivered as the network hands it over
pub type ByteStream = Pin<Box<dyn Stream<Item = RelayResult<Bytes>> + Send>>;

/// Per-call settings carried alongside a completion request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Sent as `X-Request-ID` and repeated in every log line for the call
    pub request_id: Uuid,

    /// Whole-request timeout; streaming calls use the idle window instead
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RequestOptions {
    /// Fresh request ID, default timeout
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executes `/chat/completions` calls against the provider
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Send a `stream: false` request and decode the JSON reply
    async fn execute_json(
        &self,
        request: ChatCompletionRequest,
        options: RequestOptions,
    ) -> RelayResult<ChatCompletionResponse>;

    /// Execute a streaming request and hand back the raw event-stream body
    ///
    /// Resolves once the provider has answered with a success status; the
    /// body is then read lazily through the returned stream.
    async fn execute_stream(
        &self,
        request: ChatCompletionRequest,
        options: RequestOptions,
    ) -> RelayResult<ByteStream>;
}
