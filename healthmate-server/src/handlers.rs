use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use healthmate_rag::{Citation, SearchResult};
use healthmate_vertex::CLIENT_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Chunks retrieved for `/chat`.
pub const CHAT_TOP_K: usize = 4;
/// Chunks retrieved for `/debug/retrieve`.
pub const DEBUG_TOP_K: usize = 8;

const CHAT_PREVIEW_CHARS: usize = 200;
const DEBUG_PREVIEW_CHARS: usize = 500;
const FALLBACK_FILE_NAME: &str = "upload.pdf";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub ingested_documents: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub rank: usize,
    pub score: f32,
    pub source: Option<String>,
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars: Option<usize>,
    pub preview: String,
}

impl RetrievedChunk {
    fn new(rank: usize, result: &SearchResult, preview_chars: usize, with_length: bool) -> Self {
        let Citation { source, page } = result.citation();
        let text = &result.chunk.text;
        Self {
            rank,
            score: result.score,
            source,
            page,
            chars: with_length.then(|| text.chars().count()),
            preview: text.chars().take(preview_chars).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved: Option<Vec<RetrievedChunk>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<RetrievedChunk>,
}

/// The trimmed query, or 400 when it is absent, blank or the body is not JSON.
///
/// The body is parsed whatever its `Content-Type` says.
fn require_query(body: &[u8]) -> Result<ChatRequest, ApiError> {
    let missing = || ApiError::BadRequest("Missing query".to_string());
    let mut request: ChatRequest = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "rejected request body");
        missing()
    })?;
    let query = request.query.take().map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
    request.query = Some(query.ok_or_else(missing)?);
    Ok(request)
}

/// Reduce an uploaded file name to its final path component.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => FALLBACK_FILE_NAME.to_string(),
        other => other.to_string(),
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let settings = state.settings();
    let body = match state.vertex_client().await {
        Ok(client) => json!({
            "status": "ok",
            "vertex": {
                "project": client.project_id(),
                "location": client.location(),
                "model": settings.vertex_model,
                "using_service_account": client.uses_service_account(),
                "client_version": CLIENT_VERSION,
            }
        }),
        Err(e) => json!({
            "status": "degraded",
            "vertex": { "error": e.to_string() }
        }),
    };
    Json(body)
}

/// POST /ingest (multipart field `file`)
pub async fn ingest(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let no_file = || ApiError::BadRequest("No file provided".to_string());
    let mut multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "rejected multipart body");
        no_file()
    })?;

    let mut upload = None;
    while let Some(field) =
        multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or(FALLBACK_FILE_NAME));
        let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) = upload.ok_or_else(no_file)?;

    let data_dir = &state.settings().data_dir;
    tokio::fs::create_dir_all(data_dir).await?;
    let path = data_dir.join(&file_name);
    tokio::fs::write(&path, &bytes).await?;
    info!(file = %file_name, bytes = bytes.len(), "saved upload");

    let report = state.ingestor().await?.ingest_pdf(&path).await?;
    Ok(Json(IngestResponse { ingested_documents: report.documents, chunks: report.chunks }))
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = require_query(&body)?;
    let query = request.query.unwrap_or_default();

    let retriever = state.retriever().await?;
    let composer = state.composer().await?;

    let results = retriever.retrieve(&query, CHAT_TOP_K).await?;
    let answer = composer.answer(&query, &results).await?;

    let retrieved = request.debug.then(|| {
        results
            .iter()
            .enumerate()
            .map(|(i, r)| RetrievedChunk::new(i + 1, r, CHAT_PREVIEW_CHARS, false))
            .collect()
    });

    Ok(Json(ChatResponse { answer: answer.answer, sources: answer.sources, retrieved }))
}

/// POST /debug/retrieve
pub async fn debug_retrieve(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let request = require_query(&body)?;
    let query = request.query.unwrap_or_default();

    let results = state.retriever().await?.retrieve(&query, DEBUG_TOP_K).await?;
    let results: Vec<RetrievedChunk> = results
        .iter()
        .enumerate()
        .map(|(i, r)| RetrievedChunk::new(i + 1, r, DEBUG_PREVIEW_CHARS, true))
        .collect();

    Ok(Json(RetrieveResponse { query, count: results.len(), results }))
}
