//! PDF ingestion: load → chunk → embed → upsert.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{RagError, Result};
use crate::loader::PdfLoader;
use crate::pipeline::RagPipeline;

/// Counts returned after a file has been ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Pages loaded from the file.
    pub documents: usize,
    /// Chunks written to the vector store.
    pub chunks: usize,
}

/// Feeds PDF pages into a [`RagPipeline`].
#[derive(Debug, Clone)]
pub struct Ingestor {
    loader: PdfLoader,
    pipeline: Arc<RagPipeline>,
}

impl Ingestor {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { loader: PdfLoader::new(), pipeline }
    }

    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Ingest the PDF at `path` into the pipeline's collection.
    ///
    /// Parsing runs on the blocking pool since `lopdf` is synchronous.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn ingest_pdf(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let loader = self.loader;
        let source = path.display().to_string();

        let documents = tokio::task::spawn_blocking(move || loader.load(&path))
            .await
            .map_err(|e| RagError::LoaderError { source_path: source, message: e.to_string() })??;

        let chunks = self.pipeline.ingest_batch(&documents).await?;
        let report = IngestReport { documents: documents.len(), chunks: chunks.len() };
        info!(documents = report.documents, chunks = report.chunks, "ingested pdf");
        Ok(report)
    }
}
