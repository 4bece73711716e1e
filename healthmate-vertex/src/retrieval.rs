//! Request and response types for RAG corpus `:retrieveContexts`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResource {
    pub rag_corpus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexRagStore {
    pub rag_resources: Vec<RagResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagRetrievalConfig {
    pub top_k: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQuery {
    pub text: String,
    pub rag_retrieval_config: RagRetrievalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveContextsRequest {
    pub vertex_rag_store: VertexRagStore,
    pub query: RagQuery,
}

impl RetrieveContextsRequest {
    pub fn new(rag_corpus: impl Into<String>, text: impl Into<String>, top_k: usize) -> Self {
        Self {
            vertex_rag_store: VertexRagStore {
                rag_resources: vec![RagResource { rag_corpus: rag_corpus.into() }],
            },
            query: RagQuery {
                text: text.into(),
                rag_retrieval_config: RagRetrievalConfig {
                    top_k: i32::try_from(top_k).unwrap_or(i32::MAX),
                },
            },
        }
    }
}

/// One retrieved context. Vertex reports either a `score` (higher is
/// better) or a vector `distance` depending on the corpus backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagContext {
    #[serde(default)]
    pub source_uri: Option<String>,
    #[serde(default)]
    pub source_display_name: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RagContexts {
    #[serde(default)]
    pub contexts: Vec<RagContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetrieveContextsResponse {
    #[serde(default)]
    pub contexts: RagContexts,
}
