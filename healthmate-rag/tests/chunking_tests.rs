//! Property tests for the recursive character splitter.

use std::collections::HashMap;

use healthmate_rag::{Chunker, Document, RecursiveChunker};
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    // Words, line breaks and paragraph breaks, with some multi-byte text.
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zA-Z]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
            1 => "[éüß漢字]{1,6}",
        ],
        0..400,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunks_never_exceed_chunk_size(
        text in arb_text(),
        chunk_size in 5usize..200,
        overlap_ratio in 0usize..50,
    ) {
        let overlap = chunk_size * overlap_ratio / 100;
        let chunker = RecursiveChunker::new(chunk_size, overlap);
        for chunk in chunker.split_text(&text) {
            prop_assert!(chunk.chars().count() <= chunk_size, "{} > {chunk_size}", chunk.chars().count());
            prop_assert!(!chunk.trim().is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
        }
    }

    #[test]
    fn chunking_is_deterministic(text in arb_text()) {
        let chunker = RecursiveChunker::new(50, 10);
        let doc = Document { id: "guide.pdf:0".into(), text, metadata: HashMap::new() };
        let first = chunker.chunk(&doc);
        let second = chunker.chunk(&doc);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_word_survives_splitting(text in arb_text()) {
        let chunker = RecursiveChunker::new(40, 0);
        let joined = chunker.split_text(&text).join(" ");
        for word in text.split_whitespace().filter(|w| w.chars().count() < 30) {
            prop_assert!(joined.contains(word), "lost word {word:?}");
        }
    }
}
