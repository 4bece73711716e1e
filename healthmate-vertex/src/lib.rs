//! Minimal Vertex AI REST client used by the HealthMate backend.
//!
//! Covers the three calls the backend makes against Google Cloud:
//! content generation with a publisher model, text embeddings through the
//! `:predict` endpoint, and context retrieval from a managed RAG corpus.

pub mod client;
pub mod embedding;
pub mod generation;
pub mod retrieval;


pub use client::{CLIENT_VERSION, Error, ServiceAccountKey, VertexBuilder, VertexClient};
pub use embedding::{
    EmbeddingInstance, EmbeddingParameters, PredictEmbeddingsRequest, PredictEmbeddingsResponse,
    TaskType,
};
pub use generation::{
    Candidate, Content, GenerateContentRequest, GenerationConfig, GenerationResponse, Part, Role,
    UsageMetadata,
};
pub use retrieval::{RagContext, RetrieveContextsRequest, RetrieveContextsResponse};
