//! Error types for the `healthmate-rag` crate.

use thiserror::Error;

/// Errors that can occur in ingestion, retrieval and answer composition.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A managed retrieval corpus failed to answer.
    #[error("Retrieval error ({backend}): {message}")]
    RetrievalError {
        /// The retrieval backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The hosted model failed to generate an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A PDF could not be read or parsed.
    #[error("Failed to load '{source_path}': {message}")]
    LoaderError {
        /// Path or name of the document being loaded.
        source_path: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's length does not match the collection dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
