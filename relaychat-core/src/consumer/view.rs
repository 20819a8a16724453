//! Client-side conversation state

use crate::protocol::{ChatMessage, MessageRole};

/// Fixed reply shown when a streamed answer fails
pub const APOLOGY_MESSAGE: &str = "I'm sorry, but I encountered an error. Please try again later.";

/// Why a send was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejected {
    /// The input was empty or whitespace only
    #[error("message is empty")]
    Empty,
    /// A previous answer is still streaming
    #[error("a reply is still in progress")]
    Busy,
}

/// Conversation as the user sees it, plus the loading flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationView {
    messages: Vec<ChatMessage>,
    loading: bool,
}

impl ConversationView {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation opened by the assistant's greeting
    pub fn with_greeting(name: &str) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(format!(
                "Hi {}! I'm your support assistant. How can I help you today?",
                name
            ))],
            loading: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Whether a reply is being streamed; sending is disabled meanwhile
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Start a turn: record the user message and an empty assistant reply
    ///
    /// Returns the history to send upstream, which ends with the new user
    /// message and excludes the empty placeholder.
    pub fn begin_turn(&mut self, text: &str) -> Result<Vec<ChatMessage>, SendRejected> {
        if self.loading {
            return Err(SendRejected::Busy);
        }
        if text.trim().is_empty() {
            return Err(SendRejected::Empty);
        }

        self.messages.push(ChatMessage::user(text));
        let history = self.messages.clone();
        self.messages.push(ChatMessage::assistant(""));
        self.loading = true;

        Ok(history)
    }

    /// Append a decoded fragment to the in-progress reply
    pub fn append_delta(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.in_progress_mut() {
            last.content.push_str(text);
        }
    }

    /// The reply completed normally
    pub fn finish_turn(&mut self) {
        self.loading = false;
    }

    /// The reply failed: its content is replaced by the apology
    pub fn fail_turn(&mut self) {
        match self.in_progress_mut() {
            Some(last) => last.content = APOLOGY_MESSAGE.to_string(),
            None => self.messages.push(ChatMessage::assistant(APOLOGY_MESSAGE)),
        }
        self.loading = false;
    }

    fn in_progress_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .last_mut()
            .filter(|message| message.role == MessageRole::Assistant)
    }
}
