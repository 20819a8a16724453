//! HTTP client implementation using reqwest

use crate::config::{ProviderConfig, SecretString};
use crate::error::{RelayError, RelayResult};
use crate::http::error::{map_http_error, map_transport_error};
use crate::http::{ByteStream, HttpExecutor, RequestOptions};
use crate::protocol::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Maximum blocking response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("relaychat/", env!("CARGO_PKG_VERSION"));

/// Path appended to the provider base URL
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client (internally reference counted)
    client: Client,

    /// `{base_url}/chat/completions`
    endpoint: String,

    /// Provider credential, injected from configuration
    api_key: SecretString,

    /// Stall window between streamed chunks, reported on read timeouts
    idle_timeout: Duration,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client for the configured provider
    pub fn new(config: &ProviderConfig) -> RelayResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(config.connect_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| RelayError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                CHAT_COMPLETIONS_PATH
            ),
            api_key: config.api_key.clone(),
            idle_timeout: config.stream_idle_timeout(),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the blocking response size cap
    pub fn with_max_response_size(mut self, max_response_size: usize) -> Self {
        self.max_response_size = max_response_size;
        self
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build a POST with the provider headers attached
    fn build_request(&self, request: &ChatCompletionRequest, options: &RequestOptions) -> RequestBuilder {
        self.client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose_secret()))
            .header(CONTENT_TYPE, "application/json")
            .header("X-Request-ID", options.request_id.to_string())
            .json(request)
    }

    fn oversized(&self, size: usize, request_id: Uuid) -> RelayError {
        warn!(
            "Response of at least {} bytes exceeds cap {} [request_id: {}]",
            size, self.max_response_size, request_id
        );
        RelayError::Decode(format!(
            "Response size {} exceeds maximum {} [request_id: {}]",
            size, self.max_response_size, request_id
        ))
    }

    /// Send a request and reject non-success statuses
    async fn send_checked(
        &self,
        builder: RequestBuilder,
        request: &ChatCompletionRequest,
        options: &RequestOptions,
        timeout: Duration,
    ) -> RelayResult<Response> {
        let request_id = options.request_id;

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Request timeout for model {} [request_id: {}]", request.model, request_id);
            } else {
                error!("Request error for model {} [request_id: {}]: {}", request.model, request_id, e);
            }
            map_transport_error(e, timeout, request_id)
        })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let body = response.text().await.ok();
            warn!(
                "Request failed with status {} for model {} [request_id: {}]",
                status, request.model, request_id
            );
            return Err(map_http_error(status, body, request_id));
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpExecutor for HttpClient {
    async fn execute_json(
        &self,
        request: ChatCompletionRequest,
        options: RequestOptions,
    ) -> RelayResult<ChatCompletionResponse> {
        let request_id = options.request_id;

        info!(
            "Executing blocking completion with model {} [request_id: {}]",
            request.model, request_id
        );

        let builder = self.build_request(&request, &options).timeout(options.timeout);
        let response = self
            .send_checked(builder, &request, &options, options.timeout)
            .await?;

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(self.oversized(content_length as usize, request_id));
            }
        }

        // Chunked replies declare no length, so the cap is enforced while reading.
        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| map_transport_error(e, options.timeout, request_id))?;
            if body.len() + chunk.len() > self.max_response_size {
                return Err(self.oversized(body.len() + chunk.len(), request_id));
            }
            body.extend_from_slice(&chunk);
        }

        let completion: ChatCompletionResponse = serde_json::from_slice(&body).map_err(|e| {
            error!("Failed to parse completion [request_id: {}]: {}", request_id, e);
            RelayError::Decode(format!("{} [request_id: {}]", e, request_id))
        })?;

        info!("Blocking completion finished [request_id: {}]", request_id);
        Ok(completion)
    }

    async fn execute_stream(
        &self,
        request: ChatCompletionRequest,
        options: RequestOptions,
    ) -> RelayResult<ByteStream> {
        let request_id = options.request_id;

        info!(
            "Opening completion stream with model {} [request_id: {}]",
            request.model, request_id
        );

        let builder = self
            .build_request(&request, &options)
            .header(ACCEPT, "text/event-stream");
        // No whole-request timeout here: it would cut long answers short.
        // Waiting for the status line is bounded by the idle window instead.
        let response = tokio::time::timeout(
            self.idle_timeout,
            self.send_checked(builder, &request, &options, self.idle_timeout),
        )
        .await
        .map_err(|_| RelayError::Timeout {
            seconds: self.idle_timeout.as_secs(),
        })??;

        let idle_timeout = self.idle_timeout;
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_transport_error(e, idle_timeout, request_id)));

        Ok(Box::pin(body))
    }
}
