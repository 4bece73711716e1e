//! Document chunking.
//!
//! [`RecursiveChunker`] splits text on a priority list of separators
//! (paragraphs, lines, words, characters) and merges the pieces back into
//! windows of at most `chunk_size` characters, carrying up to
//! `chunk_overlap` characters of trailing context into the next window.
//! All lengths are counted in `char`s, so multi-byte text is never cut
//! inside a code point.

use std::collections::VecDeque;

use crate::document::{CHUNK_INDEX_KEY, Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk
/// inherits the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust
/// use healthmate_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 100);
/// let pieces = chunker.split_text("first paragraph\n\nsecond paragraph");
/// assert_eq!(pieces, vec!["first paragraph\n\nsecond paragraph"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Separators tried in order; the empty separator splits into characters.
    pub const DEFAULT_SEPARATORS: [&'static str; 4] = ["\n\n", "\n", " ", ""];

    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` maximum number of characters per chunk
    /// * `chunk_overlap` number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: Self::DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Split raw text into trimmed, non-empty pieces.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Use the first separator that occurs in the text; the rest are
        // kept for pieces that are still too long.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }

        chunks
    }

    /// Greedily merge pieces into windows, dropping pieces from the front
    /// of the window until at most `chunk_overlap` characters remain.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(text) = join_trimmed(&window) {
                    merged.push(text);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some(first) = window.pop_front() else { break };
                    total -= char_len(first);
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(text) = join_trimmed(&window) {
            merged.push(text);
        }

        merged
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text,
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text before every occurrence of `separator`, so the separator
/// stays attached to the start of the following piece. An empty separator
/// splits into single characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn doc(text: &str) -> Document {
        Document {
            id: "guide.pdf:0".into(),
            text: text.into(),
            metadata: HashMap::from([("source".to_string(), "data/guide.pdf".to_string())]),
        }
    }

    #[test]
    fn separator_attaches_to_following_piece() {
        assert_eq!(split_keeping_separator("a\n\nb\n\nc", "\n\n"), vec!["a", "\n\nb", "\n\nc"]);
        assert_eq!(split_keeping_separator("\n\na", "\n\n"), vec!["\n\na"]);
        assert_eq!(split_keeping_separator("a\n\n\n\nb", "\n\n"), vec!["a", "\n\n", "\n\nb"]);
        assert_eq!(split_keeping_separator("añb", ""), vec!["a", "ñ", "b"]);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(1000, 100);
        assert_eq!(chunker.split_text("  Hydration matters.  "), vec!["Hydration matters."]);
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        let chunker = RecursiveChunker::new(1000, 100);
        assert!(chunker.chunk(&doc("   \n\n  ")).is_empty());
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn words_are_merged_with_overlap() {
        let chunker = RecursiveChunker::new(10, 5);
        let chunks = chunker.split_text("aaa bbb ccc ddd");
        // Pieces are "aaa", " bbb", " ccc", " ddd"; each window keeps the
        // trailing piece as overlap.
        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd"]);
    }

    #[test]
    fn paragraphs_are_preferred_over_words() {
        let chunker = RecursiveChunker::new(20, 0);
        let chunks = chunker.split_text("one two three\n\nfour five six");
        assert_eq!(chunks, vec!["one two three", "four five six"]);
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let chunker = RecursiveChunker::new(4, 1);
        let chunks = chunker.split_text("abcdefghij");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
        assert_eq!(chunks.last().map(|c| c.ends_with('j')), Some(true));
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunker = RecursiveChunker::new(3, 0);
        let chunks = chunker.split_text("éééééé");
        assert_eq!(chunks, vec!["ééé", "ééé"]);
    }

    #[test]
    fn chunks_inherit_metadata_and_index() {
        let chunker = RecursiveChunker::new(10, 0);
        let chunks = chunker.chunk(&doc("alpha beta gamma delta"));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("guide.pdf:0_{i}"));
            assert_eq!(chunk.document_id, "guide.pdf:0");
            assert_eq!(chunk.metadata["source"], "data/guide.pdf");
            assert_eq!(chunk.metadata[CHUNK_INDEX_KEY], i.to_string());
            assert!(chunk.embedding.is_empty());
        }
    }
}
