//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`] and a [`Chunker`],
//! bound to one collection and namespace.
//!
//! # Example
//!
//! ```rust,ignore
//! use healthmate_rag::{InMemoryVectorStore, RagConfig, RagPipeline, RecursiveChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(RecursiveChunker::new(1000, 100)))
//!     .collection("health-mate-index")
//!     .namespace("default")
//!     .build()?;
//!
//! pipeline.ingest_batch(&documents).await?;
//! let results = pipeline.query_top_k("how much water per day?", 4).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and query
/// execution (embed → search). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    collection: String,
    namespace: String,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("collection", &self.collection)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Make sure the pipeline's collection exists.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the collection exists with
    /// another dimension, or [`RagError::PipelineError`] if the vector store
    /// operation fails.
    pub async fn ensure_collection(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        let name = self.collection.as_str();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            match e {
                RagError::DimensionMismatch { .. } => e,
                other => RagError::PipelineError(format!(
                    "failed to create collection '{name}': {other}"
                )),
            }
        })
    }

    /// Ingest multiple documents through the chunk → embed → store workflow.
    ///
    /// All chunks are embedded and upserted together. Returns every chunk
    /// that was stored.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or storage fails and
    /// [`RagError::DimensionMismatch`] if the provider returns vectors of the
    /// wrong length.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        // 1. Chunk every document
        let mut chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunker.chunk(d)).collect();
        if chunks.is_empty() {
            info!(documents = documents.len(), chunk_count = 0, "ingested documents (empty)");
            return Ok(chunks);
        }

        // 2. Make sure the collection exists
        self.ensure_collection().await?;

        // 3. Generate embeddings
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(documents = documents.len(), error = %e, "embedding failed during ingestion");
            RagError::PipelineError(format!("embedding failed: {e}"))
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::PipelineError(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        // 4. Attach embeddings to chunks
        let expected = self.embedding_provider.dimensions();
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            if embedding.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: embedding.len() });
            }
            chunk.embedding = embedding;
        }

        // 5. Upsert into vector store
        self.vector_store.upsert(&self.collection, &self.namespace, &chunks).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "upsert failed during ingestion");
            RagError::PipelineError(format!(
                "upsert failed in collection '{}': {e}",
                self.collection
            ))
        })?;

        info!(
            collection = %self.collection,
            namespace = %self.namespace,
            documents = documents.len(),
            chunk_count = chunks.len(),
            "ingested documents"
        );

        Ok(chunks)
    }

    /// Query the pipeline: embed → search.
    ///
    /// Returns at most `top_k` results ordered by descending relevance score.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn query_top_k(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        self.ensure_collection().await?;

        // 1. Embed the query
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        // 2. Search the vector store
        let collection = self.collection.as_str();
        let results = self
            .vector_store
            .search(collection, &self.namespace, &query_embedding, top_k)
            .await
            .map_err(|e| {
                error!(collection, error = %e, "vector store search failed");
                RagError::PipelineError(format!("search failed in collection '{collection}': {e}"))
            })?;

        let results: Vec<SearchResult> = results.into_iter().take(top_k).collect();
        info!(result_count = results.len(), top_k, "query completed");

        Ok(results)
    }
}

#[async_trait]
impl Retriever for RagPipeline {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        self.query_top_k(query, top_k).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider`, `vector_store` and `collection` are required. The
/// config defaults to [`RagConfig::default`], the chunker to a
/// [`RecursiveChunker`] sized from the config and the namespace to
/// [`DEFAULT_NAMESPACE`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    collection: Option<String>,
    namespace: Option<String>,
}

impl RagPipelineBuilder {
    /// Set the chunking window used by the default chunker.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the collection (Pinecone index) name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// the collection name is blank.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let collection = self
            .collection
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| RagError::ConfigError("collection name is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size(), config.chunk_overlap()))
        });
        let namespace = self.namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker, collection, namespace })
    }
}
