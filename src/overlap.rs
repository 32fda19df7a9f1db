//! Second pass: carry trailing context across chunk boundaries.
//!
//! ## How It Works
//!
//! ```text
//! chunk 3: "... The sinus drains here. It joins the vein."
//!                  └──────────── last 2 sentences ────────┘
//! chunk 4: "The sinus drains here. It joins the vein. Flow continues ..."
//!           └──────────── overlap prefix ──────────┘
//! ```
//!
//! Overlap is taken from the predecessor's content as the assembler produced
//! it, never from an already-overlapped chunk, so prefixes do not compound
//! along a run of short chunks.
//!
//! No overlap is added when:
//!
//! - the chunk opens a section (overlap never crosses a section boundary),
//! - the chunk is a figure caption,
//! - the result would exceed the hard ceiling. The overlap is then dropped
//!   whole, never truncated.

use crate::budget::TokenBudget;
use crate::chunk::{finalize_sequence, Chunk};
use crate::section::same_section;
use crate::sentence::last_sentences;
use crate::tokens::TokenEstimator;

/// Default number of trailing sentences carried forward.
pub const DEFAULT_OVERLAP_SENTENCES: usize = 2;

/// Prepends trailing sentences of each chunk's predecessor.
#[derive(Debug, Clone, Copy)]
pub struct OverlapEngine {
    budget: TokenBudget,
    sentences: usize,
}

impl OverlapEngine {
    /// Carry `sentences` trailing sentences forward under `budget`.
    ///
    /// Zero sentences disables overlap.
    #[must_use]
    pub const fn new(budget: TokenBudget, sentences: usize) -> Self {
        Self { budget, sentences }
    }

    /// Produce the overlapped sequence.
    ///
    /// Ids, numbering and links are unchanged.
    pub fn apply(&self, chunks: &[Chunk], document_id: &str, tokens: &mut TokenEstimator) -> Vec<Chunk> {
        let mut drafts = Vec::with_capacity(chunks.len());
        let mut discarded = 0usize;

        for (i, chunk) in chunks.iter().enumerate() {
            let draft = chunk.to_draft();
            let previous = match i.checked_sub(1) {
                Some(prev) if self.sentences > 0 => &chunks[prev],
                _ => {
                    drafts.push(draft);
                    continue;
                }
            };
            if chunk.is_figure_caption || !same_section(previous, chunk) {
                drafts.push(draft);
                continue;
            }

            let tail = last_sentences(&previous.content, self.sentences).join(" ");
            if tail.is_empty() {
                drafts.push(draft);
                continue;
            }

            let overlapped = draft.with_overlap(&tail, tokens);
            if self.budget.fits_hard(overlapped.token_count()) {
                drafts.push(overlapped);
            } else {
                tracing::debug!(
                    chunk = %chunk.chunk_id,
                    tokens = overlapped.token_count(),
                    "overlap would exceed ceiling, discarded"
                );
                discarded += 1;
                drafts.push(draft);
            }
        }

        let overlapped = finalize_sequence(drafts, document_id);
        tracing::info!(
            chunks = overlapped.len(),
            with_overlap = overlapped.iter().filter(|c| c.overlap_tokens > 0).count(),
            discarded,
            "applied overlap"
        );
        overlapped
    }
}

impl Default for OverlapEngine {
    fn default() -> Self {
        Self::new(TokenBudget::default(), DEFAULT_OVERLAP_SENTENCES)
    }
}
