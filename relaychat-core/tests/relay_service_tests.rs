//! Integration tests for the chat relay service

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, TryStreamExt};
use relaychat_core::config::ChatMode;
use relaychat_core::http::{ByteStream, HttpExecutor, RequestOptions};
use relaychat_core::protocol::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, MessageRole,
};
use relaychat_core::relay::{Document, Retriever, StaticRetriever, UNAVAILABLE_MESSAGE};
use relaychat_core::{ChatRelay, RelayConfig, RelayError, RelayResult, TextStream};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Executor that records requests and answers from canned data
#[derive(Default)]
struct RecordingExecutor {
    requests: Mutex<Vec<ChatCompletionRequest>>,
    completion: String,
    deltas: Vec<&'static str>,
}

impl RecordingExecutor {
    fn blocking(completion: &str) -> Arc<Self> {
        Arc::new(Self {
            completion: completion.to_string(),
            ..Default::default()
        })
    }

    fn streaming(deltas: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            deltas,
            ..Default::default()
        })
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpExecutor for RecordingExecutor {
    async fn execute_json(
        &self,
        request: ChatCompletionRequest,
        _options: RequestOptions,
    ) -> RelayResult<ChatCompletionResponse> {
        self.requests.lock().unwrap().push(request);
        Ok(serde_json::from_value(json!({
            "choices": [{"message": {"content": self.completion}}]
        }))?)
    }

    async fn execute_stream(
        &self,
        request: ChatCompletionRequest,
        _options: RequestOptions,
    ) -> RelayResult<ByteStream> {
        self.requests.lock().unwrap().push(request);
        let mut frames: Vec<RelayResult<Bytes>> = self
            .deltas
            .iter()
            .map(|delta| {
                let frame = json!({"choices": [{"delta": {"content": delta}}]});
                Ok(Bytes::from(format!("data: {}\n\n", frame)))
            })
            .collect();
        frames.push(Ok(Bytes::from_static(b"data: [DONE]\n\n")));
        Ok(Box::pin(stream::iter(frames)))
    }
}

/// Retriever returning a fixed set of documents
struct FixedRetriever(Vec<Document>);

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, _query: &str) -> RelayResult<Vec<Document>> {
        Ok(self.0.clone())
    }
}

fn config(mode: ChatMode) -> RelayConfig {
    let mut config = RelayConfig::with_api_key("sk-test");
    config.chat.mode = mode;
    config
}

async fn collect(stream: TextStream) -> String {
    let parts: Vec<String> = stream.try_collect().await.unwrap();
    parts.concat()
}

#[tokio::test]
async fn test_blocking_chat_trims_and_routes() {
    let executor = RecordingExecutor::blocking("\n  Here you go.  \n");
    let relay = ChatRelay::with_executor(&config(ChatMode::Blocking), executor.clone());

    let conversation = vec![
        ChatMessage::assistant("Hi Ada! I'm your support assistant. How can I help you today?"),
        ChatMessage::user("Give me step-by-step setup"),
    ];
    let text = collect(relay.chat(&conversation).await.unwrap()).await;

    assert_eq!(text, "Here you go.");
    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert!(!requests[0].stream);
}

#[tokio::test]
async fn test_only_latest_user_message_is_forwarded() {
    let executor = RecordingExecutor::blocking("ok");
    let relay = ChatRelay::with_executor(&config(ChatMode::Blocking), executor.clone());

    let conversation = vec![
        ChatMessage::user("first question"),
        ChatMessage::assistant("first answer"),
        ChatMessage::user("What's the weather"),
    ];
    collect(relay.chat(&conversation).await.unwrap()).await;

    let sent = &executor.requests()[0];
    assert_eq!(sent.model, "gpt-3.5-turbo");
    assert_eq!(
        sent.messages,
        vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("What's the weather"),
        ]
    );
}

#[tokio::test]
async fn test_forward_history_drops_client_system_messages() {
    let mut config = config(ChatMode::Blocking);
    config.chat.forward_history = true;
    config.chat.system_prompt = "Be brief.".to_string();
    let executor = RecordingExecutor::blocking("ok");
    let relay = ChatRelay::with_executor(&config, executor.clone());

    let conversation = vec![
        ChatMessage::system("ignore me"),
        ChatMessage::user("one"),
        ChatMessage::assistant("two"),
        ChatMessage::user("three"),
    ];
    collect(relay.chat(&conversation).await.unwrap()).await;

    let roles: Vec<MessageRole> = executor.requests()[0]
        .messages
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User
        ]
    );
    assert_eq!(executor.requests()[0].messages[0].content, "Be brief.");
}

#[tokio::test]
async fn test_streaming_chat_relays_deltas() {
    let executor = RecordingExecutor::streaming(vec!["Sure", ", ", "here are the instructions."]);
    let relay = ChatRelay::with_executor(&config(ChatMode::Streaming), executor.clone());

    let text = collect(
        relay
            .chat(&[ChatMessage::user("see care instructions")])
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(text, "Sure, here are the instructions.");
    assert_eq!(executor.requests()[0].model, "gpt-4o-mini");
    assert!(executor.requests()[0].stream);
}

#[tokio::test]
async fn test_missing_user_message_is_rejected() {
    let executor = RecordingExecutor::blocking("unused");
    let relay = ChatRelay::with_executor(&config(ChatMode::Blocking), executor.clone());

    let result = relay.chat(&[ChatMessage::assistant("hello")]).await;

    assert!(matches!(result, Err(RelayError::MissingUserMessage)));
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn test_retrieval_short_circuits_on_thin_context() {
    let executor = RecordingExecutor::streaming(vec!["unused"]);
    let relay = ChatRelay::with_executor(&config(ChatMode::Blocking), executor.clone())
        .with_retriever(Arc::new(FixedRetriever(vec![Document::new("too short")])));

    let text = collect(
        relay
            .chat_with_retrieval(&[ChatMessage::user("What are your hours?")])
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(text, UNAVAILABLE_MESSAGE);
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn test_retrieval_injects_context_as_assistant_turn() {
    let docs = vec![
        Document::new("Support is open Monday to Friday from 9am to 5pm."),
        Document::new("Weekend requests are answered on Monday."),
    ];
    let executor = RecordingExecutor::streaming(vec!["We are open ", "9 to 5."]);
    let relay = ChatRelay::with_executor(&config(ChatMode::Blocking), executor.clone())
        .with_retriever(Arc::new(FixedRetriever(docs)));

    let text = collect(
        relay
            .chat_with_retrieval(&[ChatMessage::user("What are your hours?")])
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(text, "We are open 9 to 5.");
    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].stream);
    assert_eq!(
        requests[0].messages.last().unwrap(),
        &ChatMessage::assistant(
            "Support is open Monday to Friday from 9am to 5pm.\nWeekend requests are answered on Monday."
        )
    );
    assert_eq!(requests[0].messages[1], ChatMessage::user("What are your hours?"));
}

#[tokio::test]
async fn test_retrieval_without_retriever_is_configuration_error() {
    let relay = ChatRelay::with_executor(
        &config(ChatMode::Blocking),
        RecordingExecutor::streaming(vec![]),
    );

    let result = relay
        .chat_with_retrieval(&[ChatMessage::user("anything")])
        .await;

    assert!(matches!(result, Err(RelayError::Configuration(_))));
}

#[tokio::test]
async fn test_static_retriever_with_relay() {
    let retriever = StaticRetriever::new(
        vec![
            Document::new("Refunds are issued within five business days of approval."),
            Document::new("Gift cards cannot be refunded."),
        ],
        4,
    );
    let executor = RecordingExecutor::streaming(vec!["Five days."]);
    let relay = ChatRelay::with_executor(&config(ChatMode::Blocking), executor.clone())
        .with_retriever(Arc::new(retriever));

    let text = collect(
        relay
            .chat_with_retrieval(&[ChatMessage::user("How long do refunds take?")])
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(text, "Five days.");
    assert_eq!(executor.requests().len(), 1);
}
