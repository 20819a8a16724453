//! Chat relay service
//!
//! Owns everything a request needs: the upstream executor, the router, the
//! optional retriever and the retry policy. Each call is independent; the
//! only shared state is the executor's connection pool.

use crate::config::{ChatConfig, ChatMode, ProviderConfig, RelayConfig, RetrievalConfig};
use crate::error::{RelayError, RelayResult};
use crate::http::{HttpClient, HttpExecutor, RequestOptions, RetryExecutor};
use crate::protocol::{latest_user_message, ChatCompletionRequest, ChatMessage, MessageRole};
use crate::relay::retrieval::{
    build_context, has_sufficient_context, Retriever, StaticRetriever, UNAVAILABLE_MESSAGE,
};
use crate::relay::router::ModelRouter;
use crate::relay::stream::{one_shot, relay_text_stream, TextStream};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Relays conversations to the provider and hands back live text streams
#[derive(Clone)]
pub struct ChatRelay {
    executor: Arc<dyn HttpExecutor>,
    retriever: Option<Arc<dyn Retriever>>,
    router: ModelRouter,
    retry: RetryExecutor,
    provider: ProviderConfig,
    chat: ChatConfig,
    retrieval: RetrievalConfig,
}

impl ChatRelay {
    /// Build a relay talking to the configured provider over HTTP
    ///
    /// When `retrieval.documents_path` is set, a `StaticRetriever` is loaded
    /// from it.
    pub fn new(config: &RelayConfig) -> RelayResult<Self> {
        let client = HttpClient::new(&config.provider)?;
        let mut relay = Self::with_executor(config, Arc::new(client));

        if let Some(path) = &config.retrieval.documents_path {
            let retriever = StaticRetriever::from_file(path, config.retrieval.top_k)?;
            info!("Retrieval enabled with {} documents", retriever.len());
            relay = relay.with_retriever(Arc::new(retriever));
        }

        Ok(relay)
    }

    /// Build a relay over an arbitrary executor
    pub fn with_executor(config: &RelayConfig, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            retriever: None,
            router: ModelRouter::new(&config.routing),
            retry: RetryExecutor::new(config.retry.clone()),
            provider: config.provider.clone(),
            chat: config.chat.clone(),
            retrieval: config.retrieval.clone(),
        }
    }

    /// Attach the retrieval collaborator
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Messages forwarded upstream for a client conversation
    ///
    /// The configured system prompt always comes first. By default only the
    /// latest user turn follows it; with `forward_history` the whole
    /// conversation (minus client system messages) does.
    pub fn build_messages(&self, conversation: &[ChatMessage]) -> RelayResult<Vec<ChatMessage>> {
        let question = latest_user_message(conversation).ok_or(RelayError::MissingUserMessage)?;

        let mut messages = vec![ChatMessage::system(self.chat.system_prompt.clone())];
        if self.chat.forward_history {
            messages.extend(
                conversation
                    .iter()
                    .filter(|message| message.role != MessageRole::System)
                    .cloned(),
            );
        } else {
            messages.push(question.clone());
        }
        Ok(messages)
    }

    /// Handle the plain chat endpoint: route, assemble, call upstream
    pub async fn chat(&self, conversation: &[ChatMessage]) -> RelayResult<TextStream> {
        let model = self.router.select(conversation)?.to_string();
        let messages = self.build_messages(conversation)?;

        match self.chat.mode {
            ChatMode::Blocking => self.complete(&model, messages).await,
            ChatMode::Streaming => self.stream(&model, messages).await,
        }
    }

    /// Handle the retrieval endpoint: fetch context, short-circuit when it
    /// is too thin, otherwise inject it and stream the answer
    pub async fn chat_with_retrieval(&self, conversation: &[ChatMessage]) -> RelayResult<TextStream> {
        let retriever = self.retriever.as_ref().ok_or_else(|| {
            RelayError::Configuration("retrieval endpoint used without a retriever".to_string())
        })?;

        let question = latest_user_message(conversation).ok_or(RelayError::MissingUserMessage)?;
        let documents = retriever.retrieve(&question.content).await?;
        let context = build_context(&documents);

        debug!(
            "Retrieved {} documents ({} chars of context)",
            documents.len(),
            context.chars().count()
        );

        if !has_sufficient_context(&context, self.retrieval.min_context_chars) {
            info!("Insufficient context for query, skipping model call");
            return Ok(one_shot(UNAVAILABLE_MESSAGE));
        }

        let model = self.router.select(conversation)?.to_string();
        let mut messages = self.build_messages(conversation)?;
        messages.push(ChatMessage::assistant(context));

        self.stream(&model, messages).await
    }

    /// Single blocking call replayed as a one-chunk stream
    pub async fn complete(&self, model: &str, messages: Vec<ChatMessage>) -> RelayResult<TextStream> {
        let request = ChatCompletionRequest::new(model, messages, false);
        let options = RequestOptions::new().with_timeout(self.provider.request_timeout());

        let response = self
            .retry
            .execute(|| self.executor.execute_json(request.clone(), options.clone()))
            .await?;

        let content = response.first_content().ok_or_else(|| {
            RelayError::Decode(format!(
                "completion contained no message content [request_id: {}]",
                options.request_id
            ))
        })?;

        Ok(one_shot(content.trim()))
    }

    /// Streaming call relayed delta by delta
    pub async fn stream(&self, model: &str, messages: Vec<ChatMessage>) -> RelayResult<TextStream> {
        let request = ChatCompletionRequest::new(model, messages, true);
        let options = RequestOptions::new();
        let request_id = options.request_id;

        let body = self
            .retry
            .execute(|| self.executor.execute_stream(request.clone(), options.clone()))
            .await
            .inspect_err(|e| warn!("Failed to open upstream stream [request_id: {}]: {}", request_id, e))?;

        Ok(relay_text_stream(
            body,
            self.provider.max_frame_bytes,
            self.provider.stream_idle_timeout(),
            request_id,
        ))
    }
}
