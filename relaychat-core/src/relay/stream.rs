//! Outgoing text streams
//!
//! `relay_text_stream` turns a raw upstream body into decoded text deltas.
//! It is pull-driven: the upstream is only read when the consumer asks for
//! the next item, so decoded text never piles up ahead of the client.

use crate::error::{RelayError, RelayResult};
use crate::http::ByteStream;
use crate::relay::frame::FrameDecoder;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Live, read-once sequence of UTF-8 text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = RelayResult<String>> + Send>>;

/// A stream yielding exactly one chunk and then ending
pub fn one_shot(text: impl Into<String>) -> TextStream {
    Box::pin(stream::once(futures::future::ready(Ok(text.into()))))
}

/// Relay state carried between polls
struct RelayState {
    upstream: ByteStream,
    decoder: FrameDecoder,
    pending: VecDeque<String>,
    idle_timeout: Duration,
    request_id: Uuid,
    done: bool,
    emitted: usize,
}

impl Drop for RelayState {
    fn drop(&mut self) {
        if !self.done {
            debug!(
                "Downstream went away before completion, releasing upstream [request_id: {}]",
                self.request_id
            );
        }
    }
}

/// Decode an upstream event-stream body into text deltas
pub fn relay_text_stream(
    upstream: ByteStream,
    max_frame_bytes: usize,
    idle_timeout: Duration,
    request_id: Uuid,
) -> TextStream {
    let state = RelayState {
        upstream,
        decoder: FrameDecoder::new(max_frame_bytes),
        pending: VecDeque::new(),
        idle_timeout,
        request_id,
        done: false,
        emitted: 0,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                state.emitted += delta.len();
                return Some((Ok(delta), state));
            }

            if state.done || state.decoder.is_finished() {
                if !state.done {
                    state.done = true;
                    debug!(
                        "Relay finished after {} bytes of text [request_id: {}]",
                        state.emitted, state.request_id
                    );
                }
                return None;
            }

            let next = match tokio::time::timeout(state.idle_timeout, state.upstream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    state.done = true;
                    let err = RelayError::Timeout {
                        seconds: state.idle_timeout.as_secs(),
                    };
                    return Some((Err(err), state));
                }
            };

            match next {
                Some(Ok(bytes)) => match state.decoder.push(&bytes) {
                    Ok(deltas) => state.pending.extend(deltas),
                    Err(err) => {
                        state.done = true;
                        return Some((Err(err), state));
                    }
                },
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    let tail = state.decoder.finish();
                    state.pending.extend(tail);
                }
            }
        }
    }))
}
