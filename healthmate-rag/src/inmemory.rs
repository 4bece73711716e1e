//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps every collection in a `HashMap` behind a
//! `tokio::sync::RwLock`. It backs tests and local runs without a Pinecone
//! key.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    namespaces: HashMap<String, HashMap<String, Chunk>>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Layout: collection name → namespace → chunk ID → chunk.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored in a namespace (0 if it does not exist).
    pub async fn len(&self, collection: &str, namespace: &str) -> usize {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|c| c.namespaces.get(namespace))
            .map_or(0, HashMap::len)
    }

    /// Whether the named collection exists.
    pub async fn has_collection(&self, name: &str) -> bool {
        self.collections.read().await.contains_key(name)
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, namespaces: HashMap::new() });
        if collection.dimensions != dimensions {
            return Err(RagError::DimensionMismatch {
                expected: collection.dimensions,
                actual: dimensions,
            });
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, namespace: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;

        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != store.dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: store.dimensions,
                actual: bad.embedding.len(),
            });
        }

        let entries = store.namespaces.entry(namespace.to_string()).or_default();
        for chunk in chunks {
            entries.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        if embedding.len() != store.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: store.dimensions,
                actual: embedding.len(),
            });
        }

        let Some(entries) = store.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<SearchResult> = entries
            .values()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.into(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::new(),
            document_id: "doc".into(),
        }
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryVectorStore::new();
        store.create_collection("idx", 2).await.unwrap();
        store.upsert("idx", "a", &[chunk("x", vec![1.0, 0.0])]).await.unwrap();
        store.upsert("idx", "b", &[chunk("y", vec![0.0, 1.0])]).await.unwrap();

        let results = store.search("idx", "a", &[0.0, 1.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "x");
        assert!(store.search("idx", "missing", &[1.0, 0.0], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let store = InMemoryVectorStore::new();
        store.create_collection("idx", 3).await.unwrap();

        let err = store.upsert("idx", "ns", &[chunk("x", vec![1.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));

        let err = store.search("idx", "ns", &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 1 }));

        let err = store.create_collection("idx", 4).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 4 }));
    }

    #[tokio::test]
    async fn create_is_idempotent_and_upsert_overwrites() {
        let store = InMemoryVectorStore::new();
        store.create_collection("idx", 2).await.unwrap();
        store.create_collection("idx", 2).await.unwrap();
        store.upsert("idx", "ns", &[chunk("x", vec![1.0, 0.0])]).await.unwrap();
        store.upsert("idx", "ns", &[chunk("x", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.len("idx", "ns").await, 1);
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", "ns", &[1.0], 1).await.is_err());
        assert!(!store.has_collection("nope").await);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
