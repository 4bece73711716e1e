//! PDF loading: one [`Document`] per page.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::document::{Document, PAGE_KEY, SOURCE_KEY};
use crate::error::{RagError, Result};

/// Loads PDF files into per-page [`Document`]s using `lopdf`.
///
/// Every page becomes a document, including pages without extractable
/// text, so `page` metadata always matches the page's position in the
/// file. Page numbers are zero-based. Document IDs are
/// `{file_name}:{page}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse the PDF at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Document>> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| RagError::LoaderError {
            source_path: source.clone(),
            message: e.to_string(),
        })?;
        self.load_bytes(&bytes, &source)
    }

    /// Parse an in-memory PDF, recording `source` as each page's origin.
    pub fn load_bytes(&self, bytes: &[u8], source: &str) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(bytes).map_err(|e| RagError::LoaderError {
            source_path: source.to_string(),
            message: e.to_string(),
        })?;

        let file_name = Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());

        let pages = pdf.get_pages();
        let mut documents = Vec::with_capacity(pages.len());

        for (position, page_number) in pages.keys().enumerate() {
            let text = match pdf.extract_text(&[*page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(source, page = position, error = %e, "no extractable text on page");
                    String::new()
                }
            };

            let metadata = HashMap::from([
                (SOURCE_KEY.to_string(), source.to_string()),
                (PAGE_KEY.to_string(), position.to_string()),
            ]);

            documents.push(Document { id: format!("{file_name}:{position}"), text, metadata });
        }

        debug!(source, pages = documents.len(), "loaded pdf");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_loader_error() {
        let err = PdfLoader::new().load_bytes(b"definitely not a pdf", "notes.pdf").unwrap_err();
        match err {
            RagError::LoaderError { source_path, .. } => assert_eq!(source_path, "notes.pdf"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_a_loader_error() {
        let err = PdfLoader::new().load("/nonexistent/dir/file.pdf").unwrap_err();
        assert!(matches!(err, RagError::LoaderError { .. }));
        assert!(err.to_string().contains("/nonexistent/dir/file.pdf"));
    }
}
