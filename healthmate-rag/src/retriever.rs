//! Retriever trait shared by the vector-database and managed-corpus modes.

use async_trait::async_trait;

use crate::document::SearchResult;
use crate::error::Result;

/// Returns the chunks most relevant to a query.
///
/// [`RagPipeline`](crate::RagPipeline) implements this over a
/// [`VectorStore`](crate::VectorStore); the `vertex` feature adds a
/// retriever backed by a managed RAG corpus. Both are interchangeable
/// behind `Arc<dyn Retriever>`.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `top_k` results ordered by descending relevance.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>>;
}
