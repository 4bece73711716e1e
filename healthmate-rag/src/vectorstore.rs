//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections, each created with a fixed
/// vector dimension and cosine similarity. Entries live in namespaces
/// inside a collection; a search only sees its own namespace.
///
/// Upserting or searching with a vector whose length differs from the
/// collection dimension fails with
/// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection if it does not exist yet.
    ///
    /// Fails if the collection exists with a different dimension.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Upsert chunks into a namespace of a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, namespace: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
