//! Transport from the consumer to a relay server

use super::error::ConsumerError;
use crate::protocol::ChatMessage;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tracing::debug;
use url::Url;

/// Raw reply body as it arrives from the server
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<Bytes, ConsumerError>> + Send>>;

/// Server endpoint a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    #[default]
    Chat,
    Retrieval,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Chat => "chat",
            Endpoint::Retrieval => "chat/retrieval",
        }
    }
}

/// Opens a reply stream for a conversation history
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, history: &[ChatMessage]) -> Result<ReplyStream, ConsumerError>;
}

/// reqwest-backed transport posting the history as JSON
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str, endpoint: Endpoint) -> Result<Self, ConsumerError> {
        Self::with_client(reqwest::Client::new(), server_url, endpoint)
    }

    pub fn with_client(
        client: reqwest::Client,
        server_url: &str,
        endpoint: Endpoint,
    ) -> Result<Self, ConsumerError> {
        let invalid = |message: String| ConsumerError::InvalidUrl {
            url: server_url.to_string(),
            message,
        };

        let base = Url::parse(&format!("{}/", server_url.trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        let url = base.join(endpoint.path()).map_err(|e| invalid(e.to_string()))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, history: &[ChatMessage]) -> Result<ReplyStream, ConsumerError> {
        debug!("POST {} with {} messages", self.url, history.len());

        let response = self.client.post(self.url.clone()).json(history).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsumerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ConsumerError::Read(e.to_string())));
        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let chat = HttpTransport::new("http://localhost:3000", Endpoint::Chat).unwrap();
        assert_eq!(chat.url().as_str(), "http://localhost:3000/chat");

        let retrieval = HttpTransport::new("http://localhost:3000/", Endpoint::Retrieval).unwrap();
        assert_eq!(retrieval.url().as_str(), "http://localhost:3000/chat/retrieval");

        let prefixed = HttpTransport::new("https://example.com/support", Endpoint::Chat).unwrap();
        assert_eq!(prefixed.url().as_str(), "https://example.com/support/chat");
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            HttpTransport::new("not a url", Endpoint::Chat),
            Err(ConsumerError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpTransport::new("ftp://example.com", Endpoint::Chat),
            Err(ConsumerError::InvalidUrl { .. })
        ));
    }
}
