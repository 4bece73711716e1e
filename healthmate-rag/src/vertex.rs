//! Vertex AI adapters: embeddings, chat generation and RAG-corpus retrieval.
//!
//! All three wrap a shared [`VertexClient`], so one authenticated client
//! (and its cached service account token) serves every call.
//!
//! This module is only available when the `vertex` feature is enabled.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use healthmate_vertex::{
    Content, EmbeddingParameters, GenerateContentRequest, GenerationConfig, PredictEmbeddingsRequest,
    RetrieveContextsRequest, TaskType, VertexClient,
};

use crate::chat::{ChatModel, Prompt};
use crate::document::{Chunk, SOURCE_KEY, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::retriever::Retriever;

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
/// Default generative model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";
/// Sampling temperature used for answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// An [`EmbeddingProvider`] backed by a Vertex AI text embedding model.
///
/// Queries are embedded with the `RETRIEVAL_QUERY` task type, document
/// chunks with `RETRIEVAL_DOCUMENT`. Batches larger than `batch_size` are
/// split into several `:predict` calls.
#[derive(Debug, Clone)]
pub struct VertexEmbeddingProvider {
    client: VertexClient,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl VertexEmbeddingProvider {
    /// Default number of instances per `:predict` call.
    pub const DEFAULT_BATCH_SIZE: usize = 32;

    /// Use `text-embedding-004` (768 dimensions).
    pub fn new(client: VertexClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: crate::EMBEDDING_DIM,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Vector length requested from the model as `outputDimensionality`.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn map_err(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: "Vertex".to_string(), message: message.into() }
    }

    fn request(&self, texts: &[&str], task_type: TaskType) -> PredictEmbeddingsRequest {
        PredictEmbeddingsRequest::new(texts.iter().copied(), task_type).with_parameters(
            EmbeddingParameters { output_dimensionality: Some(self.dimensions) },
        )
    }

    async fn predict(&self, texts: &[&str], task_type: TaskType) -> Result<Vec<Vec<f32>>> {
        let request = self.request(texts, task_type);
        let response = self.client.predict_embeddings(&self.model, &request).await.map_err(|e| {
            error!(provider = "Vertex", model = %self.model, error = %e, "embedding request failed");
            Self::map_err(e.to_string())
        })?;

        let vectors = response.into_vectors();
        if vectors.len() != texts.len() {
            return Err(Self::map_err(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for VertexEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Vertex", text_len = text.len(), "embedding query");
        let mut vectors = self.predict(&[text], TaskType::RetrievalQuery).await?;
        vectors.pop().ok_or_else(|| Self::map_err("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "Vertex", batch_size = texts.len(), model = %self.model, "embedding batch");

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all.extend(self.predict(batch, TaskType::RetrievalDocument).await?);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`ChatModel`] backed by a Gemini model on Vertex AI.
#[derive(Debug, Clone)]
pub struct VertexChatModel {
    client: VertexClient,
    model: String,
    temperature: f32,
    max_output_tokens: Option<i32>,
}

impl VertexChatModel {
    /// Use `gemini-1.5-flash` at temperature 0.2.
    pub fn new(client: VertexClient) -> Self {
        Self {
            client,
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: i32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    fn request(&self, prompt: &Prompt) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(&prompt.human)],
            system_instruction: Some(Content::system(&prompt.system)),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                max_output_tokens: self.max_output_tokens,
            }),
        }
    }
}

#[async_trait]
impl ChatModel for VertexChatModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = self.request(prompt);
        let response = self.client.generate_content(&self.model, &request).await.map_err(|e| {
            error!(provider = "Vertex", model = %self.model, error = %e, "generation failed");
            RagError::GenerationError { provider: "Vertex".to_string(), message: e.to_string() }
        })?;

        let text = response.text();
        if text.is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .or_else(|| response.candidates.first().and_then(|c| c.finish_reason.clone()))
                .unwrap_or_else(|| "no candidates".to_string());
            warn!(model = %self.model, reason = %reason, "model returned no text");
            return Err(RagError::GenerationError {
                provider: "Vertex".to_string(),
                message: format!("model returned no text ({reason})"),
            });
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// A [`Retriever`] over a managed Vertex AI RAG corpus.
#[derive(Debug, Clone)]
pub struct RagCorpusRetriever {
    client: VertexClient,
    corpus: String,
}

impl RagCorpusRetriever {
    /// `corpus` is the full resource name,
    /// `projects/{p}/locations/{l}/ragCorpora/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the corpus name is empty.
    pub fn new(client: VertexClient, corpus: impl Into<String>) -> Result<Self> {
        let corpus = corpus.into();
        if corpus.trim().is_empty() {
            return Err(RagError::ConfigError("RAG_CORPUS is not set".to_string()));
        }
        Ok(Self { client, corpus })
    }

    pub fn corpus(&self) -> &str {
        &self.corpus
    }
}

#[async_trait]
impl Retriever for RagCorpusRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let request = RetrieveContextsRequest::new(&self.corpus, query, top_k);
        let response = self.client.retrieve_contexts(&request).await.map_err(|e| {
            error!(corpus = %self.corpus, error = %e, "corpus retrieval failed");
            RagError::RetrievalError { backend: "VertexRag".to_string(), message: e.to_string() }
        })?;

        let mut results: Vec<SearchResult> = response
            .contexts
            .contexts
            .into_iter()
            .enumerate()
            .map(|(i, ctx)| {
                let score = ctx.score.or(ctx.distance.map(|d| 1.0 - d)).unwrap_or_default() as f32;
                let mut metadata = HashMap::new();
                if let Some(uri) = ctx.source_uri.or(ctx.source_display_name) {
                    metadata.insert(SOURCE_KEY.to_string(), uri);
                }
                SearchResult {
                    chunk: Chunk {
                        id: format!("context_{i}"),
                        text: ctx.text,
                        embedding: Vec::new(),
                        metadata,
                        document_id: String::new(),
                    },
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        debug!(corpus = %self.corpus, results = results.len(), "corpus retrieval");
        Ok(results)
    }
}
