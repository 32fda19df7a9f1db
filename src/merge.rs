//! Third pass: fold small chunks into a neighbour in the same section.
//!
//! ## Double-Pass Algorithm
//!
//! A chunk ends up below the minimum for one of two reasons, and each needs a
//! different neighbour:
//!
//! ```text
//! backward: tail of a long block     [ 480 ][ 30 ]   ->  [ 480 + 30 ]
//! forward:  opener of a new section  | [ 30 ][ 300 ] ->  | [ 30 + 300 ]
//! ```
//!
//! 1. **Backward pass**: each small chunk joins the previous result chunk when
//!    both are in one section and the combined chunk fits the soft target.
//! 2. **Forward pass**: a small chunk still standing at the start of its
//!    section joins the chunk after it, under the same conditions.
//!
//! A chunk whose overlap prefix was copied from the chunk it merges with loses
//! that prefix, so merged text never repeats a sentence.
//!
//! Figure captions are never merged, in either role. Merged chunks are
//! re-measured from their joined content, never by summing counts, and the
//! sequence is renumbered and relinked at the end.

use crate::budget::TokenBudget;
use crate::chunk::{finalize_sequence, Chunk, ChunkDraft};
use crate::section::{opens_section, same_section};
use crate::tokens::TokenEstimator;

/// Merges chunks below the minimum token count.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    budget: TokenBudget,
}

impl MergeEngine {
    /// Create a merger working against `budget`.
    #[must_use]
    pub const fn new(budget: TokenBudget) -> Self {
        Self { budget }
    }

    /// Produce the merged, renumbered sequence.
    pub fn apply(&self, chunks: &[Chunk], document_id: &str, tokens: &mut TokenEstimator) -> Vec<Chunk> {
        let backward = self.merge_backward(chunks, tokens);
        let after_backward = backward.len();
        let forward = self.merge_forward(&backward, tokens);

        tracing::info!(
            before = chunks.len(),
            after_backward,
            after_forward = forward.len(),
            "merged small chunks"
        );
        finalize_sequence(forward, document_id)
    }

    fn merge_backward(&self, chunks: &[Chunk], tokens: &mut TokenEstimator) -> Vec<ChunkDraft> {
        let mut merged: Vec<ChunkDraft> = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let draft = chunk.to_draft();
            if self.is_mergeable(&draft) {
                if let Some(last) = merged.last_mut() {
                    if let Some(combined) = self.combine(last, &draft, tokens) {
                        tracing::debug!(chunk = %chunk.chunk_id, "merged backward");
                        *last = combined;
                        continue;
                    }
                }
            }
            merged.push(draft);
        }

        merged
    }

    fn merge_forward(&self, drafts: &[ChunkDraft], tokens: &mut TokenEstimator) -> Vec<ChunkDraft> {
        let mut merged = Vec::with_capacity(drafts.len());
        let mut i = 0;

        while let Some(current) = drafts.get(i) {
            if self.is_mergeable(current) && opens_section(drafts, i) {
                let combined = drafts
                    .get(i + 1)
                    .and_then(|next| self.combine(current, next, tokens));
                if let Some(combined) = combined {
                    tracing::debug!(position = i, "merged forward");
                    merged.push(combined);
                    i += 2;
                    continue;
                }
            }
            merged.push(current.clone());
            i += 1;
        }

        merged
    }

    fn is_mergeable(&self, draft: &ChunkDraft) -> bool {
        self.budget.is_small(draft.token_count()) && !draft.is_figure_caption()
    }

    /// `first` followed by `second`, if the pair may be merged.
    fn combine(&self, first: &ChunkDraft, second: &ChunkDraft, tokens: &mut TokenEstimator) -> Option<ChunkDraft> {
        if first.is_figure_caption() || second.is_figure_caption() || !same_section(first, second) {
            return None;
        }
        let mut combined = first.clone();
        combined.absorb(second, tokens);
        self.budget.fits_soft(combined.token_count()).then_some(combined)
    }
}
