//! Reading a reply into the conversation

use super::decoder::Utf8StreamDecoder;
use super::error::ConsumerError;
use super::transport::ChatTransport;
use super::view::ConversationView;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drains a reply stream into the trailing assistant message
pub struct StreamConsumer;

impl StreamConsumer {
    /// Pull chunks one at a time until the stream ends or fails
    ///
    /// Every decoded fragment is appended to the view and passed to
    /// `on_delta`. On a read error the partial reply is replaced by the
    /// apology and the error is returned. Loading is cleared either way.
    pub async fn consume<S, F>(
        view: &mut ConversationView,
        mut stream: S,
        mut on_delta: F,
    ) -> Result<(), ConsumerError>
    where
        S: Stream<Item = Result<Bytes, ConsumerError>> + Unpin,
        F: FnMut(&str),
    {
        let mut decoder = Utf8StreamDecoder::new();
        let mut received = 0usize;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    received += bytes.len();
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() {
                        view.append_delta(&text);
                        on_delta(&text);
                    }
                }
                Err(e) => {
                    warn!("Reply failed after {} bytes: {}", received, e);
                    view.fail_turn();
                    return Err(e);
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            view.append_delta(&tail);
            on_delta(&tail);
        }

        debug!("Reply complete ({} bytes)", received);
        view.finish_turn();
        Ok(())
    }
}

/// A conversation bound to a transport
pub struct ChatSession {
    view: ConversationView,
    transport: Arc<dyn ChatTransport>,
}

impl ChatSession {
    pub fn new(view: ConversationView, transport: Arc<dyn ChatTransport>) -> Self {
        Self { view, transport }
    }

    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    /// Send one user message and stream the reply into the view
    ///
    /// Rejected sends leave the view untouched. Failures to open the reply
    /// are handled like mid-stream failures: the apology takes the reply's
    /// place.
    pub async fn send<F>(&mut self, text: &str, on_delta: F) -> Result<(), ConsumerError>
    where
        F: FnMut(&str),
    {
        let history = self.view.begin_turn(text)?;

        let stream = match self.transport.open(&history).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Could not open reply: {}", e);
                self.view.fail_turn();
                return Err(e);
            }
        };

        StreamConsumer::consume(&mut self.view, stream, on_delta).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::view::{SendRejected, APOLOGY_MESSAGE};
    use futures::stream;

    fn chunks(
        parts: Vec<Result<&'static [u8], ConsumerError>>,
    ) -> impl Stream<Item = Result<Bytes, ConsumerError>> + Unpin {
        stream::iter(parts.into_iter().map(|part| part.map(Bytes::from_static)))
    }

    #[tokio::test]
    async fn test_consume_appends_in_order() {
        let mut view = ConversationView::new();
        view.begin_turn("hi").unwrap();

        let mut seen = Vec::new();
        let bytes = "héllo".as_bytes();
        let result = StreamConsumer::consume(
            &mut view,
            chunks(vec![Ok(&bytes[..2]), Ok(&bytes[2..])]),
            |text| seen.push(text.to_string()),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(seen.concat(), "héllo");
        assert_eq!(view.last().unwrap().content, "héllo");
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn test_consume_error_leaves_apology() {
        let mut view = ConversationView::new();
        view.begin_turn("hi").unwrap();

        let result = StreamConsumer::consume(
            &mut view,
            chunks(vec![
                Ok(&b"partial"[..]),
                Err(ConsumerError::Read("connection reset".to_string())),
                Ok(&b"never read"[..]),
            ]),
            |_| {},
        )
        .await;

        assert!(result.unwrap_err().is_mid_stream());
        assert_eq!(view.last().unwrap().content, APOLOGY_MESSAGE);
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn test_consume_empty_stream() {
        let mut view = ConversationView::new();
        view.begin_turn("hi").unwrap();

        StreamConsumer::consume(&mut view, chunks(vec![]), |_| {}).await.unwrap();
        assert_eq!(view.last().unwrap().content, "");
        assert!(!view.is_loading());
    }

    #[test]
    fn test_rejected_converts() {
        let err: ConsumerError = SendRejected::Busy.into();
        assert!(matches!(err, ConsumerError::Rejected(SendRejected::Busy)));
    }
}
