//! Document retrieval abstraction
//!
//! The retrieval collaborator: consumed by the conversational executor to
//! augment answers with relevant passages. The engine never talks to a
//! concrete index directly; `Retriever` is the seam, and the shipped
//! implementation is the SQLite full-text search in
//! [`crate::db::DocumentRepository`].

use anyhow::Result;
use async_trait::async_trait;

/// One retrieved passage
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    /// Passage text
    pub content: String,

    /// Stable identifier of the source document
    pub source_id: String,

    /// Relevance score, higher is better
    pub score: f64,
}

/// Retrieval collaborator trait
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages relevant to `query`, best first
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>>;
}
