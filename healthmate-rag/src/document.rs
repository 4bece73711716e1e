//! Data types for documents, chunks, search results and citations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the source path or URI of a document.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the zero-based page number of a document.
pub const PAGE_KEY: &str = "page";
/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// A source document (one PDF page) containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// The `source` metadata value, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }

    /// The `page` metadata value parsed as a number, if present.
    pub fn page(&self) -> Option<u32> {
        self.metadata.get(PAGE_KEY).and_then(|p| p.parse().ok())
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

impl SearchResult {
    /// Provenance of this result for answer citations.
    pub fn citation(&self) -> Citation {
        Citation {
            source: self.chunk.metadata.get(SOURCE_KEY).cloned(),
            page: self.chunk.metadata.get(PAGE_KEY).and_then(|p| p.parse().ok()),
        }
    }
}

/// Where a retrieved chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: Option<String>,
    pub page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_reads_source_and_page() {
        let metadata = HashMap::from([
            (SOURCE_KEY.to_string(), "data/guide.pdf".to_string()),
            (PAGE_KEY.to_string(), "3".to_string()),
        ]);
        let result = SearchResult {
            chunk: Chunk {
                id: "guide.pdf:3_0".into(),
                text: "t".into(),
                embedding: vec![],
                metadata,
                document_id: "guide.pdf:3".into(),
            },
            score: 0.5,
        };
        assert_eq!(
            result.citation(),
            Citation { source: Some("data/guide.pdf".into()), page: Some(3) }
        );
    }

    #[test]
    fn citation_tolerates_missing_page() {
        let result = SearchResult {
            chunk: Chunk {
                id: "c".into(),
                text: "t".into(),
                embedding: vec![],
                metadata: HashMap::from([(SOURCE_KEY.to_string(), "gs://b/x.pdf".to_string())]),
                document_id: String::new(),
            },
            score: 0.1,
        };
        let citation = result.citation();
        assert_eq!(citation.source.as_deref(), Some("gs://b/x.pdf"));
        assert_eq!(citation.page, None);
        assert_eq!(serde_json::to_value(&citation).unwrap()["page"], serde_json::Value::Null);
    }
}
