//! Shared application state with lazily constructed service clients.
//!
//! Every external client lives in a `tokio::sync::OnceCell`. The first
//! request that needs one builds it; a failed build is not cached, so the
//! next request tries again. Tests seed the cells with fakes up front.

use std::sync::Arc;

use healthmate_rag::pinecone::PineconeVectorStore;
use healthmate_rag::vertex::{RagCorpusRetriever, VertexChatModel, VertexEmbeddingProvider};
use healthmate_rag::{
    AnswerComposer, ChatModel, EmbeddingProvider, Ingestor, RagPipeline, Retriever, VectorStore,
};
use healthmate_vertex::{ServiceAccountKey, VertexBuilder, VertexClient};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::ApiError;
use crate::settings::{RetrievalMode, Settings};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    settings: Settings,
    vertex: OnceCell<VertexClient>,
    embedder: OnceCell<Arc<dyn EmbeddingProvider>>,
    vector_store: OnceCell<Arc<dyn VectorStore>>,
    chat_model: OnceCell<Arc<dyn ChatModel>>,
    corpus: OnceCell<Arc<dyn Retriever>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("settings", &self.inner.settings).finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                vertex: OnceCell::new(),
                embedder: OnceCell::new(),
                vector_store: OnceCell::new(),
                chat_model: OnceCell::new(),
                corpus: OnceCell::new(),
            }),
        }
    }

    /// Use `embedder` instead of building a Vertex embedding provider.
    pub fn with_embedder(self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let _ = self.inner.embedder.set(embedder);
        self
    }

    /// Use `store` instead of connecting to Pinecone.
    pub fn with_vector_store(self, store: Arc<dyn VectorStore>) -> Self {
        let _ = self.inner.vector_store.set(store);
        self
    }

    /// Use `model` instead of building a Vertex chat model.
    pub fn with_chat_model(self, model: Arc<dyn ChatModel>) -> Self {
        let _ = self.inner.chat_model.set(model);
        self
    }

    /// Use `retriever` for corpus mode instead of the Vertex RAG corpus.
    pub fn with_corpus_retriever(self, retriever: Arc<dyn Retriever>) -> Self {
        let _ = self.inner.corpus.set(retriever);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// The shared Vertex AI client.
    ///
    /// Credentials are tried in order: the service account file, then
    /// `GOOGLE_API_KEY`, then `GOOGLE_ACCESS_TOKEN`. The project comes from
    /// `GCP_PROJECT` or, failing that, the service account file.
    pub async fn vertex_client(&self) -> Result<&VertexClient, ApiError> {
        self.inner.vertex.get_or_try_init(|| async { self.build_vertex_client() }).await
    }

    fn build_vertex_client(&self) -> Result<VertexClient, ApiError> {
        let settings = self.settings();
        let key = if settings.credentials_path.is_file() {
            let key = ServiceAccountKey::from_file(&settings.credentials_path)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Some(key)
        } else {
            None
        };

        let project = settings
            .gcp_project
            .clone()
            .or_else(|| key.as_ref().and_then(|k| k.project_id.clone()))
            .ok_or_else(|| {
                ApiError::config(
                    "GCP project is not configured",
                    "Set GCP_PROJECT or provide a service account file with a project_id",
                )
            })?;

        let builder = VertexBuilder::new(&project, &settings.gcp_location);
        let builder = match (key, &settings.google_api_key, &settings.google_access_token) {
            (Some(key), _, _) => builder.with_service_account(key),
            (None, Some(api_key), _) => builder.with_api_key(api_key),
            (None, None, Some(token)) => builder.with_access_token(token),
            (None, None, None) => {
                return Err(ApiError::config(
                    "Google Cloud credentials are not configured",
                    format!(
                        "Place a service account key at {} or set GOOGLE_APPLICATION_CREDENTIALS, GOOGLE_API_KEY or GOOGLE_ACCESS_TOKEN",
                        settings.credentials_path.display()
                    ),
                ));
            }
        };

        let client = builder.build().map_err(|e| ApiError::Internal(e.to_string()))?;
        info!(
            project = client.project_id(),
            location = client.location(),
            service_account = client.uses_service_account(),
            "vertex client initialized"
        );
        Ok(client)
    }

    pub async fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>, ApiError> {
        self.inner
            .embedder
            .get_or_try_init(|| async {
                let client = self.vertex_client().await?.clone();
                let settings = self.settings();
                let provider = VertexEmbeddingProvider::new(client)
                    .with_model(&settings.embedding_model)
                    .with_dimensions(settings.embedding_dimensions);
                Ok::<Arc<dyn EmbeddingProvider>, ApiError>(Arc::new(provider))
            })
            .await
            .cloned()
    }

    pub async fn vector_store(&self) -> Result<Arc<dyn VectorStore>, ApiError> {
        self.inner
            .vector_store
            .get_or_try_init(|| async {
                let settings = self.settings();
                let api_key = settings.pinecone_api_key.clone().ok_or_else(|| {
                    ApiError::config(
                        "PINECONE_API_KEY is not set",
                        "Set PINECONE_API_KEY in the environment or .env file",
                    )
                })?;
                let store = PineconeVectorStore::new(api_key)?
                    .with_serverless(&settings.pinecone_cloud, &settings.pinecone_region);
                info!(cloud = %settings.pinecone_cloud, region = %settings.pinecone_region, "pinecone store initialized");
                Ok::<Arc<dyn VectorStore>, ApiError>(Arc::new(store))
            })
            .await
            .cloned()
    }

    pub async fn chat_model(&self) -> Result<Arc<dyn ChatModel>, ApiError> {
        self.inner
            .chat_model
            .get_or_try_init(|| async {
                let client = self.vertex_client().await?.clone();
                let settings = self.settings();
                let mut model = VertexChatModel::new(client)
                    .with_model(&settings.vertex_model)
                    .with_temperature(settings.temperature);
                if let Some(tokens) = settings.max_output_tokens {
                    model = model.with_max_output_tokens(tokens);
                }
                Ok::<Arc<dyn ChatModel>, ApiError>(Arc::new(model))
            })
            .await
            .cloned()
    }

    /// A pipeline bound to the configured index and namespace.
    pub async fn pipeline(&self) -> Result<Arc<RagPipeline>, ApiError> {
        let settings = self.settings();
        let collection = settings.pinecone_index.clone().ok_or_else(|| {
            ApiError::config(
                "No vector collection configured",
                "Set PINECONE_INDEX to the name of the Pinecone index",
            )
        })?;

        let pipeline = RagPipeline::builder()
            .config(settings.chunking)
            .embedding_provider(self.embedder().await?)
            .vector_store(self.vector_store().await?)
            .collection(collection)
            .namespace(&settings.pinecone_namespace)
            .build()?;
        Ok(Arc::new(pipeline))
    }

    pub async fn ingestor(&self) -> Result<Ingestor, ApiError> {
        Ok(Ingestor::new(self.pipeline().await?))
    }

    /// The retriever for the configured [`RetrievalMode`].
    pub async fn retriever(&self) -> Result<Arc<dyn Retriever>, ApiError> {
        match self.settings().retrieval_mode {
            RetrievalMode::Vector => Ok(self.pipeline().await?),
            RetrievalMode::Corpus => self
                .inner
                .corpus
                .get_or_try_init(|| async {
                    let corpus = self.settings().rag_corpus.clone().ok_or_else(|| {
                        ApiError::config(
                            "RAG_CORPUS is not set",
                            "Set RAG_CORPUS to projects/{project}/locations/{location}/ragCorpora/{id}",
                        )
                    })?;
                    let client = self.vertex_client().await?.clone();
                    let retriever = RagCorpusRetriever::new(client, corpus)?;
                    Ok::<Arc<dyn Retriever>, ApiError>(Arc::new(retriever))
                })
                .await
                .cloned(),
        }
    }

    pub async fn composer(&self) -> Result<AnswerComposer, ApiError> {
        let composer = AnswerComposer::new(self.chat_model().await?);
        Ok(match &self.settings().system_prompt {
            Some(persona) => composer.with_system_prompt(persona),
            None => composer,
        })
    }
}
