//! Pinecone vector store backend.
//!
//! Talks to the Pinecone REST API with `reqwest`: the control plane
//! (`https://api.pinecone.io`) to describe and create serverless indexes, and
//! each index's data-plane host for `vectors/upsert` and `query`.
//!
//! Pinecone namespaces map directly onto [`VectorStore`] namespaces. Chunk
//! text is stored in the vector metadata under `text`, next to the chunk's
//! own metadata (all values as strings) and its `document_id`.
//!
//! This module is only available when the `pinecone` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use healthmate_rag::pinecone::PineconeVectorStore;
//!
//! let store = PineconeVectorStore::new("pc-...")?.with_serverless("aws", "us-east-1");
//! store.create_collection("health-mate-index", 768).await?;
//! store.upsert("health-mate-index", "default", &chunks).await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use url::Url;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io/";
const API_VERSION: &str = "2024-07";
const TEXT_KEY: &str = "text";
const DOCUMENT_ID_KEY: &str = "document_id";

/// Maximum number of vectors sent in one upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// What the store needs to know about an index after describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexInfo {
    host: String,
    dimension: usize,
}

/// A [`VectorStore`] backed by [Pinecone](https://www.pinecone.io/) serverless indexes.
///
/// Index descriptions are cached after the first successful lookup, so the
/// control plane is only contacted once per index and process.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    api_key: String,
    control_url: Url,
    cloud: String,
    region: String,
    ready_attempts: u32,
    poll_interval: Duration,
    indexes: RwLock<HashMap<String, IndexInfo>>,
}

impl std::fmt::Debug for PineconeVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeVectorStore")
            .field("control_url", &self.control_url.as_str())
            .field("cloud", &self.cloud)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl PineconeVectorStore {
    /// Create a store authenticated with the given API key.
    ///
    /// New indexes are provisioned on `aws` / `us-east-1` unless
    /// [`with_serverless`](Self::with_serverless) says otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("PINECONE_API_KEY is not set".to_string()));
        }
        let control_url = Url::parse(CONTROL_PLANE_URL).map_err(|e| Self::map_err(e.to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            control_url,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            ready_attempts: 60,
            poll_interval: Duration::from_secs(1),
            indexes: RwLock::new(HashMap::new()),
        })
    }

    /// Set the cloud and region used when creating a serverless index.
    pub fn with_serverless(mut self, cloud: impl Into<String>, region: impl Into<String>) -> Self {
        self.cloud = cloud.into();
        self.region = region.into();
        self
    }

    /// Override the control-plane base URL.
    pub fn with_control_url(mut self, url: Url) -> Self {
        self.control_url = url;
        self
    }

    /// Bound the readiness wait after creating an index.
    pub fn with_readiness_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.ready_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    fn map_err(message: impl Into<String>) -> RagError {
        RagError::VectorStoreError { backend: "Pinecone".to_string(), message: message.into() }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn control_endpoint(&self, path: &str) -> Result<String> {
        self.control_url.join(path).map(String::from).map_err(|e| Self::map_err(e.to_string()))
    }

    /// Data-plane URL for an index host. Hosts reported by Pinecone carry no
    /// scheme; a host that already has one is used unchanged.
    fn data_endpoint(host: &str, path: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}/{path}")
        } else {
            format!("https://{host}/{path}")
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            error!(backend = "Pinecone", operation, error = %e, "request failed");
            Self::map_err(format!("{operation} request failed: {e}"))
        })?;
        let response = Self::check(response, operation).await?;
        response.json().await.map_err(|e| {
            error!(backend = "Pinecone", operation, error = %e, "failed to parse response");
            Self::map_err(format!("failed to parse {operation} response: {e}"))
        })
    }

    async fn check(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        error!(backend = "Pinecone", operation, %status, "API error");
        Err(Self::map_err(format!("{operation} returned {status}: {detail}")))
    }

    /// Describe an index, or `None` if it does not exist.
    async fn describe_index(&self, name: &str) -> Result<Option<IndexModel>> {
        let url = self.control_endpoint(&format!("indexes/{name}"))?;
        let response = self.request(reqwest::Method::GET, &url).send().await.map_err(|e| {
            error!(backend = "Pinecone", index = name, error = %e, "describe request failed");
            Self::map_err(format!("describe index request failed: {e}"))
        })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, "describe index").await?;
        let model = response
            .json()
            .await
            .map_err(|e| Self::map_err(format!("failed to parse index description: {e}")))?;
        Ok(Some(model))
    }

    async fn create_index(&self, name: &str, dimensions: usize) -> Result<()> {
        let url = self.control_endpoint("indexes")?;
        let body = CreateIndexRequest {
            name,
            dimension: dimensions,
            metric: "cosine",
            spec: IndexSpec {
                serverless: ServerlessSpec { cloud: &self.cloud, region: &self.region },
            },
        };
        let response =
            self.request(reqwest::Method::POST, &url).json(&body).send().await.map_err(|e| {
                error!(backend = "Pinecone", index = name, error = %e, "create request failed");
                Self::map_err(format!("create index request failed: {e}"))
            })?;
        // Another process may have created it between describe and create.
        if response.status() == reqwest::StatusCode::CONFLICT {
            debug!(index = name, "index already exists");
            return Ok(());
        }
        Self::check(response, "create index").await?;
        info!(index = name, dimensions, cloud = %self.cloud, region = %self.region, "created pinecone index");
        Ok(())
    }

    async fn wait_until_ready(&self, name: &str) -> Result<IndexModel> {
        for attempt in 1..=self.ready_attempts {
            if let Some(model) = self.describe_index(name).await? {
                if model.status.ready && !model.host.is_empty() {
                    return Ok(model);
                }
            }
            debug!(index = name, attempt, "waiting for index to become ready");
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(Self::map_err(format!(
            "index '{name}' was not ready after {} checks",
            self.ready_attempts
        )))
    }

    /// Cached index info, describing the index on first use.
    async fn index_info(&self, name: &str) -> Result<IndexInfo> {
        if let Some(info) = self.indexes.read().await.get(name) {
            return Ok(info.clone());
        }
        let model = self
            .describe_index(name)
            .await?
            .ok_or_else(|| Self::map_err(format!("index '{name}' does not exist")))?;
        let info = IndexInfo { host: model.host, dimension: model.dimension };
        self.indexes.write().await.insert(name.to_string(), info.clone());
        Ok(info)
    }
}

// ── Pinecone API request/response types ────────────────────────────

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    dimension: usize,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorRecord<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct VectorRecord<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: serde_json::Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn to_record(chunk: &Chunk) -> VectorRecord<'_> {
    let mut metadata: serde_json::Map<String, Value> =
        chunk.metadata.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
    metadata.insert(TEXT_KEY.to_string(), Value::String(chunk.text.clone()));
    metadata.insert(DOCUMENT_ID_KEY.to_string(), Value::String(chunk.document_id.clone()));
    VectorRecord { id: &chunk.id, values: &chunk.embedding, metadata }
}

fn from_match(m: QueryMatch) -> SearchResult {
    let mut text = String::new();
    let mut document_id = String::new();
    let mut metadata = HashMap::new();

    for (key, value) in m.metadata.unwrap_or_default() {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => number_to_string(&n),
            other => other.to_string(),
        };
        match key.as_str() {
            TEXT_KEY => text = value,
            DOCUMENT_ID_KEY => document_id = value,
            _ => {
                metadata.insert(key, value);
            }
        }
    }

    SearchResult {
        chunk: Chunk { id: m.id, text, embedding: Vec::new(), metadata, document_id },
        score: m.score,
    }
}

/// Whole numbers (Pinecone returns `2.0` for a stored `2`) render without a fraction.
fn number_to_string(n: &serde_json::Number) -> String {
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => (f as u64).to_string(),
        _ => n.to_string(),
    }
}

// ── VectorStore implementation ─────────────────────────────────────

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let cached = self.indexes.read().await.get(name).cloned();

        let info = match cached {
            Some(info) => info,
            None => {
                let model = match self.describe_index(name).await? {
                    Some(model) if model.status.ready && !model.host.is_empty() => model,
                    Some(_) => self.wait_until_ready(name).await?,
                    None => {
                        self.create_index(name, dimensions).await?;
                        self.wait_until_ready(name).await?
                    }
                };
                let info = IndexInfo { host: model.host, dimension: model.dimension };
                self.indexes.write().await.insert(name.to_string(), info.clone());
                info
            }
        };

        if info.dimension != dimensions {
            return Err(RagError::DimensionMismatch {
                expected: info.dimension,
                actual: dimensions,
            });
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, namespace: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let info = self.index_info(collection).await?;
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != info.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: info.dimension,
                actual: bad.embedding.len(),
            });
        }

        let url = Self::data_endpoint(&info.host, "vectors/upsert");
        for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
            let body = UpsertRequest { vectors: batch.iter().map(to_record).collect(), namespace };
            let response: UpsertResponse =
                self.send(self.request(reqwest::Method::POST, &url).json(&body), "upsert").await?;
            debug!(
                index = collection,
                namespace,
                upserted = response.upserted_count,
                "upserted batch"
            );
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
        let info = self.index_info(collection).await?;
        if embedding.len() != info.dimension {
            return Err(RagError::DimensionMismatch {
                expected: info.dimension,
                actual: embedding.len(),
            });
        }

        let url = Self::data_endpoint(&info.host, "query");
        let body = QueryRequest { namespace, vector: embedding, top_k, include_metadata: true };
        let response: QueryResponse =
            self.send(self.request(reqwest::Method::POST, &url).json(&body), "query").await?;

        let mut results: Vec<SearchResult> = response.matches.into_iter().map(from_match).collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        debug!(index = collection, namespace, results = results.len(), "pinecone query");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_config_error() {
        assert!(matches!(PineconeVectorStore::new("  "), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn data_endpoint_adds_scheme_only_when_missing() {
        assert_eq!(
            PineconeVectorStore::data_endpoint("idx-abc.svc.pinecone.io", "query"),
            "https://idx-abc.svc.pinecone.io/query"
        );
        assert_eq!(
            PineconeVectorStore::data_endpoint("http://127.0.0.1:9000/", "vectors/upsert"),
            "http://127.0.0.1:9000/vectors/upsert"
        );
    }

    #[test]
    fn record_metadata_carries_text_and_document_id() {
        let chunk = Chunk {
            id: "guide.pdf:0_0".into(),
            text: "drink water".into(),
            embedding: vec![0.1, 0.2],
            metadata: HashMap::from([("page".to_string(), "0".to_string())]),
            document_id: "guide.pdf:0".into(),
        };
        let record = serde_json::to_value(to_record(&chunk)).unwrap();
        assert_eq!(record["id"], "guide.pdf:0_0");
        assert_eq!(record["metadata"]["text"], "drink water");
        assert_eq!(record["metadata"]["document_id"], "guide.pdf:0");
        assert_eq!(record["metadata"]["page"], "0");
    }

    #[test]
    fn match_metadata_is_split_back_into_chunk_fields() {
        let m: QueryMatch = serde_json::from_value(serde_json::json!({
            "id": "guide.pdf:2_1",
            "score": 0.83,
            "metadata": {"text": "rest well", "document_id": "guide.pdf:2", "source": "data/guide.pdf", "page": 2.0}
        }))
        .unwrap();
        let result = from_match(m);
        assert_eq!(result.chunk.text, "rest well");
        assert_eq!(result.chunk.document_id, "guide.pdf:2");
        assert_eq!(result.chunk.metadata["source"], "data/guide.pdf");
        assert_eq!(result.chunk.metadata["page"], "2");
        assert_eq!(result.citation().page, Some(2));
        assert!(!result.chunk.metadata.contains_key("text"));
    }
}
