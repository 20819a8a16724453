//! Retrieval step for the context-augmented endpoint
//!
//! The document store is an external collaborator behind the `Retriever`
//! trait. `StaticRetriever` is a small in-memory implementation backed by a
//! documents file, enough to run the endpoint without an external store.

use crate::error::{RelayError, RelayResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Reply sent instead of a model answer when retrieval finds too little
pub const UNAVAILABLE_MESSAGE: &str =
    "I'm sorry, but I don't have enough information to answer that question.";

/// A supporting document returned by a retriever
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text injected into the prompt
    pub content: String,

    /// Where the text came from, for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }
}

/// Source of supporting documents for a query
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Documents relevant to `query`, most relevant first
    async fn retrieve(&self, query: &str) -> RelayResult<Vec<Document>>;
}

/// Join document contents with newlines, in retriever order
pub fn build_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a joined context is long enough to be worth a model call
pub fn has_sufficient_context(context: &str, min_chars: usize) -> bool {
    context.chars().count() >= min_chars
}

/// In-memory keyword-overlap retriever
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    documents: Vec<Document>,
    top_k: usize,
}

impl StaticRetriever {
    /// Create a retriever over a fixed document set
    pub fn new(documents: Vec<Document>, top_k: usize) -> Self {
        Self { documents, top_k }
    }

    /// Load documents from a JSON or YAML array of `{content, source}`
    pub fn from_file(path: impl AsRef<Path>, top_k: usize) -> RelayResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Configuration(format!("Failed to read documents '{}': {}", path.display(), e))
        })?;

        let documents: Vec<Document> = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&raw).map_err(|e| {
                RelayError::Configuration(format!("Invalid documents '{}': {}", path.display(), e))
            })?,
            _ => serde_yaml::from_str(&raw).map_err(|e| {
                RelayError::Configuration(format!("Invalid documents '{}': {}", path.display(), e))
            })?,
        };

        debug!("Loaded {} documents from {}", documents.len(), path.display());
        Ok(Self::new(documents, top_k))
    }

    /// Number of documents held
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(|word| word.to_lowercase())
        .collect()
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, query: &str) -> RelayResult<Vec<Document>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .map(|doc| (terms(&doc.content).intersection(&query_terms).count(), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps file order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("Passwords can be reset from the account settings page."),
            Document::new("Invoices are emailed on the first day of each month."),
            Document::new("To reset a router, hold the reset button for ten seconds."),
        ]
    }

    #[test]
    fn test_build_context_joins_in_order() {
        let docs = vec![Document::new("first"), Document::new("second")];
        assert_eq!(build_context(&docs), "first\nsecond");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_threshold_counts_characters() {
        let context = "é".repeat(49);
        assert!(!has_sufficient_context(&context, 50));
        assert!(has_sufficient_context(&"é".repeat(50), 50));
    }

    #[tokio::test]
    async fn test_static_retriever_ranks_by_overlap() {
        let retriever = StaticRetriever::new(corpus(), 2);
        let docs = retriever.retrieve("How do I reset the router?").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].content.contains("router"));
        assert!(docs[1].content.contains("Passwords"));
    }

    #[tokio::test]
    async fn test_static_retriever_no_match() {
        let retriever = StaticRetriever::new(corpus(), 3);
        assert!(retriever.retrieve("weather forecast").await.unwrap().is_empty());
        assert!(retriever.retrieve("a b").await.unwrap().is_empty());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "- content: Support hours are 9am to 5pm.\n  source: faq.md\n- content: Shipping takes three days."
        )
        .unwrap();

        let retriever = StaticRetriever::from_file(file.path(), 4).unwrap();
        assert_eq!(retriever.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = StaticRetriever::from_file("/nonexistent/docs.json", 4).unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }
}
