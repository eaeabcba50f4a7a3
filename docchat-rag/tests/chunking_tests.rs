//! Property tests for the document chunkers.

use docchat_rag::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use docchat_rag::document::{CHUNK_INDEX_KEY, Document};
use proptest::prelude::*;

/// Words of up to eight letters joined by spaces, newlines and blank lines.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        ("[a-zé]{1,8}", prop::sample::select(vec![" ", " ", " ", "\n", "\n\n"])),
        1..80,
    )
    .prop_map(|parts| parts.into_iter().map(|(word, sep)| format!("{word}{sep}")).collect())
}

fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (10usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn recursive_chunks_are_bounded_trimmed_and_cover_every_word(
        text in arb_text(),
        (size, overlap) in arb_sizes(),
    ) {
        let document = Document::new("doc", text.clone());
        let chunks = RecursiveChunker::new(size, overlap).chunk(&document);

        prop_assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            let index = i.to_string();
            prop_assert!(chunk.text.chars().count() <= size);
            prop_assert!(!chunk.text.is_empty());
            prop_assert_eq!(chunk.text.trim(), chunk.text.as_str());
            prop_assert_eq!(chunk.metadata.get(CHUNK_INDEX_KEY), Some(&index));
            prop_assert_eq!(&chunk.document_id, "doc");
        }
        for word in text.split_whitespace() {
            prop_assert!(
                chunks.iter().any(|c| c.text.contains(word)),
                "word {:?} missing from every chunk", word
            );
        }
    }

    #[test]
    fn fixed_size_chunks_are_bounded_and_never_blank(
        text in arb_text(),
        (size, overlap) in arb_sizes(),
    ) {
        let document = Document::new("doc", text.clone());
        let chunks = FixedSizeChunker::new(size, overlap).chunk(&document);

        prop_assert!(!chunks.is_empty());
        for chunk in &chunks {
            prop_assert!(chunk.text.chars().count() <= size);
            prop_assert!(!chunk.text.trim().is_empty());
        }
    }
}
