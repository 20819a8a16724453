//! Request handlers

use crate::{ApiError, AppState};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::Json;
use futures::TryStreamExt;
use relaychat_core::{ChatMessage, TextStream};
use tracing::{error, info};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// `POST /chat`
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Vec<ChatMessage>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(conversation) = payload?;
    info!("POST /chat with {} messages", conversation.len());

    let stream = state.relay.chat(&conversation).await?;
    Ok(text_response(stream))
}

/// `POST /chat/retrieval`
pub async fn chat_with_retrieval(
    State(state): State<AppState>,
    payload: Result<Json<Vec<ChatMessage>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(conversation) = payload?;
    info!("POST /chat/retrieval with {} messages", conversation.len());

    let stream = state.relay.chat_with_retrieval(&conversation).await?;
    Ok(text_response(stream))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}

/// Stream text fragments as an unframed body
///
/// An error after the first byte can no longer change the status, so it
/// aborts the body instead.
fn text_response(stream: TextStream) -> Response {
    let body = stream.inspect_err(|e| error!("Aborting reply mid-stream: {}", e));

    let mut response = Response::new(Body::from_stream(body));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
    response
}
