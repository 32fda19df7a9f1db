//! Property-based tests for the chunking pipeline.
//!
//! These tests verify that every finished chunk set maintains key invariants:
//! - Ceiling: no chunk exceeds the hard token limit
//! - Context: `content_with_context` is the breadcrumb plus content
//! - Linked: numbering and prev/next links match array order
//! - Merged: no two adjacent small chunks remain in one section
//! - Overlap: an overlap prefix is the predecessor's trailing sentences
//! - Coverage: assembling loses no words

use proptest::prelude::*;
use quarry::{
    assemble, estimate_tokens, last_sentences, verify_sequence, BlockKind, Chunk, ContentBlock,
    Document, FigureIndex, OverlapEngine, Pipeline, Splitter, TokenBudget, TokenEstimator,
    HARD_MAX_TOKENS, MIN_TOKENS,
};

// =============================================================================
// Test Generators
// =============================================================================

/// A capitalized sentence of lowercase words ending in a period.
fn sentence() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,10}( [a-z]{1,12}){0,14}\\.").unwrap()
}

/// One to twenty sentences.
fn paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec(sentence(), 1..20).prop_map(|sentences| sentences.join(" "))
}

/// Sections of paragraphs; a section may carry a figure caption.
fn sections() -> impl Strategy<Value = Vec<(Vec<String>, bool)>> {
    prop::collection::vec(
        (prop::collection::vec(paragraph(), 1..6), any::<bool>()),
        1..5,
    )
}

fn build_document(sections: &[(Vec<String>, bool)]) -> Document {
    let mut blocks = Vec::new();
    for (s, (paragraphs, with_caption)) in sections.iter().enumerate() {
        let header_id = format!("p0-section_header-{s}");
        blocks.push(ContentBlock::new(
            header_id.as_str(),
            BlockKind::SectionHeader,
            0,
            format!("SECTION {s}"),
        ));
        for (p, text) in paragraphs.iter().enumerate() {
            blocks.push(
                ContentBlock::new(format!("p0-text-{s}-{p}"), BlockKind::Text, 0, text.as_str())
                    .with_ancestors([header_id.as_str()]),
            );
        }
        if *with_caption {
            blocks.push(
                ContentBlock::new(
                    format!("p0-figure_caption-{s}"),
                    BlockKind::FigureCaption,
                    0,
                    format!("Fig. {s}.1 Diagram of section {s}."),
                )
                .with_ancestors([header_id.as_str()]),
            );
        }
    }
    Document::new("prop").with_page(blocks)
}

fn run(doc: &Document) -> Vec<Chunk> {
    Pipeline::default()
        .run(doc, &FigureIndex::default())
        .unwrap()
        .chunks
}

// =============================================================================
// Pipeline invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn chunks_respect_ceiling(sections in sections()) {
        let chunks = run(&build_document(&sections));
        for chunk in &chunks {
            prop_assert!(chunk.token_count <= HARD_MAX_TOKENS, "{} has {}", chunk.chunk_id, chunk.token_count);
            prop_assert_eq!(chunk.token_count, estimate_tokens(&chunk.content_with_context));
        }
    }

    #[test]
    fn context_formula_holds(sections in sections()) {
        for chunk in run(&build_document(&sections)) {
            prop_assert_eq!(
                &chunk.content_with_context,
                &format!("{}\n\n{}", chunk.breadcrumb_text, chunk.content)
            );
            prop_assert!(!chunk.breadcrumb.is_empty());
        }
    }

    #[test]
    fn sequence_is_linked(sections in sections()) {
        let chunks = run(&build_document(&sections));
        prop_assert!(verify_sequence(&chunks, &TokenBudget::default()).is_ok());
        if let (Some(first), Some(last)) = (chunks.first(), chunks.last()) {
            prop_assert!(first.previous_chunk_id.is_none());
            prop_assert!(last.next_chunk_id.is_none());
        }
    }

    #[test]
    fn no_adjacent_small_chunks_in_a_section(sections in sections()) {
        let chunks = run(&build_document(&sections));
        for pair in chunks.windows(2) {
            let excused = pair.iter().any(|c| c.is_figure_caption)
                || pair[0].parent_section_id != pair[1].parent_section_id;
            let both_small = pair[0].token_count < MIN_TOKENS && pair[1].token_count < MIN_TOKENS;
            prop_assert!(excused || !both_small, "{} and {} are both small", pair[0].chunk_id, pair[1].chunk_id);
        }
    }

    #[test]
    fn pipeline_is_deterministic(sections in sections()) {
        let doc = build_document(&sections);
        prop_assert_eq!(run(&doc), run(&doc));
    }
}

// =============================================================================
// Stage invariants
// =============================================================================

fn assembled(doc: &Document, tokens: &mut TokenEstimator) -> Vec<Chunk> {
    assemble(doc, &FigureIndex::default(), &Splitter::default(), tokens).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn overlap_is_predecessor_tail(sections in sections()) {
        let doc = build_document(&sections);
        let mut tokens = TokenEstimator::default();
        let before = assembled(&doc, &mut tokens);
        let after = OverlapEngine::default().apply(&before, &doc.id, &mut tokens);

        prop_assert_eq!(before.len(), after.len());
        for i in 1..after.len() {
            if after[i].overlap_tokens == 0 {
                prop_assert_eq!(&after[i].content, &before[i].content);
                continue;
            }
            let tail = last_sentences(&before[i - 1].content, 2).join(" ");
            prop_assert_eq!(&after[i].content, &format!("{tail} {}", before[i].content));
            prop_assert_eq!(after[i].overlap_tokens, estimate_tokens(&tail));
            prop_assert!(!after[i].is_figure_caption);
            prop_assert_eq!(&after[i].parent_section_id, &before[i - 1].parent_section_id);
        }
    }

    #[test]
    fn assembling_keeps_every_word(sections in sections()) {
        let doc = build_document(&sections);
        let mut tokens = TokenEstimator::default();
        let chunks = assembled(&doc, &mut tokens);

        let expected: Vec<&str> = doc
            .chunkable_blocks()
            .flat_map(|block| block.content.split_whitespace())
            .collect();
        let actual: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.content.split_whitespace())
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn splitter_stays_under_ceiling(text in paragraph()) {
        let block = ContentBlock::new("p0-text-0", BlockKind::Text, 0, text).with_ancestors(["h"]);
        let mut tokens = TokenEstimator::default();
        let budget = TokenBudget::new(10, 64, 80).unwrap();
        let drafts = Splitter::new(budget)
            .split(&block, &["H".to_owned()], &mut tokens)
            .unwrap();

        for draft in &drafts {
            prop_assert!(draft.token_count() <= budget.hard_max());
            prop_assert!(draft.content().split_whitespace().count() > 0);
        }
    }
}
