//! Keyword model routing
//!
//! The latest user message decides between two models: the instruct model
//! when it mentions any routing keyword, the general model otherwise.

use crate::config::RoutingConfig;
use crate::error::{RelayError, RelayResult};
use crate::protocol::{latest_user_message, ChatMessage};
use tracing::info;

/// Static keyword predicate over the latest user message
#[derive(Debug, Clone)]
pub struct ModelRouter {
    instruct_model: String,
    general_model: String,
    keywords: Vec<String>,
}

impl ModelRouter {
    /// Create a router from configuration
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            instruct_model: config.instruct_model.clone(),
            general_model: config.general_model.clone(),
            keywords: config.keywords.clone(),
        }
    }

    /// Pick a model for a raw query string
    ///
    /// Matching is a case-sensitive substring test.
    pub fn route_query(&self, query: &str) -> &str {
        if self.keywords.iter().any(|keyword| query.contains(keyword.as_str())) {
            info!("Using instruct model {}", self.instruct_model);
            &self.instruct_model
        } else {
            info!("Using general model {}", self.general_model);
            &self.general_model
        }
    }

    /// Pick a model for a conversation, inspecting only its latest user turn
    pub fn select(&self, conversation: &[ChatMessage]) -> RelayResult<&str> {
        let question = latest_user_message(conversation).ok_or(RelayError::MissingUserMessage)?;
        Ok(self.route_query(&question.content))
    }

    pub fn instruct_model(&self) -> &str {
        &self.instruct_model
    }

    pub fn general_model(&self) -> &str {
        &self.general_model
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}
