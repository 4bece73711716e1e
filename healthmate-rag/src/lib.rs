//! Retrieval-augmented answering over ingested PDF documents.
//!
//! The crate is organised around four seams:
//!
//! - [`EmbeddingProvider`] turns text into fixed-dimension vectors
//! - [`VectorStore`] persists chunks in namespaced collections and searches them
//! - [`Retriever`] returns the top-K chunks for a query
//! - [`ChatModel`] generates an answer from an assembled [`Prompt`]
//!
//! [`RagPipeline`] composes an embedding provider, a vector store and a
//! [`Chunker`]; [`Ingestor`] feeds it pages from [`PdfLoader`]; and
//! [`AnswerComposer`] turns retrieved chunks into a cited [`Answer`].
//!
//! Backends:
//!
//! - [`InMemoryVectorStore`] (always available)
//! - [`pinecone::PineconeVectorStore`] (feature `pinecone`)
//! - [`vertex`] embedding, chat and RAG-corpus adapters (feature `vertex`)

pub mod chat;
pub mod chunking;
pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod inmemory;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "pinecone")]
pub mod pinecone;
#[cfg(feature = "vertex")]
pub mod vertex;

pub use chat::{ChatModel, Prompt};
pub use chunking::{Chunker, RecursiveChunker};
pub use composer::{Answer, AnswerComposer};
pub use config::RagConfig;
pub use document::{Chunk, Citation, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use ingest::{IngestReport, Ingestor};
pub use inmemory::InMemoryVectorStore;
pub use loader::PdfLoader;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use vectorstore::VectorStore;

/// Dimensionality of `text-embedding-004` vectors.
pub const EMBEDDING_DIM: usize = 768;
