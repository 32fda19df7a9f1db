//! Chunks: self-contained, token-bounded units of a document.
//!
//! A chunk lives in two shapes:
//!
//! - [`ChunkDraft`] while stages are still cutting, overlapping and merging
//!   text. It knows its content and provenance but not its place in the
//!   sequence.
//! - [`Chunk`] once [`finalize_sequence`] has numbered a whole run of drafts
//!   and linked them into a doubly linked list.
//!
//! ## The context invariant
//!
//! Every chunk carries its breadcrumb twice: as labels and rendered into the
//! text that gets embedded.
//!
//! ```text
//! content_with_context = breadcrumb_text + "\n\n" + content
//!
//! [Context: THE CEREBRAL VEINS]
//!
//! The cerebral veins drain the brain.
//! ```
//!
//! `token_count` and `character_count` measure `content_with_context` and are
//! recomputed every time the content changes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::breadcrumb::{format_breadcrumb, DOCUMENT_ROOT};
use crate::budget::TokenBudget;
use crate::figure::FigureRef;
use crate::section::Sectioned;
use crate::sentence::split_sentences;
use crate::tokens::TokenEstimator;
use crate::{Error, Result};

/// A finished chunk, positioned in its document's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}-chunk-{sequence:04}`.
    pub chunk_id: String,
    /// Ancestor header labels, never empty.
    pub breadcrumb: Vec<String>,
    /// `"[Context: A > B]"`.
    pub breadcrumb_text: String,
    /// The chunk's own text.
    pub content: String,
    /// `breadcrumb_text + "\n\n" + content`.
    pub content_with_context: String,
    /// Sorted 1-based pages the content spans.
    pub page_numbers: Vec<u32>,
    /// Originating block ids, without duplicates.
    pub source_block_ids: Vec<String>,
    /// Position in the document, from 0.
    pub sequence_number: usize,
    /// Id of the preceding chunk.
    pub previous_chunk_id: Option<String>,
    /// Id of the following chunk.
    pub next_chunk_id: Option<String>,
    /// Section the chunk belongs to.
    pub parent_section_id: String,
    /// Figures this chunk is or mentions.
    pub figure_references: Vec<FigureRef>,
    /// Estimated tokens of `content_with_context`.
    pub token_count: usize,
    /// Characters of `content_with_context`.
    pub character_count: usize,
    /// Tokens prepended from the previous chunk.
    pub overlap_tokens: usize,
    /// Whether the chunk is a figure caption.
    pub is_figure_caption: bool,
    /// Table detection is not implemented; always `false`.
    pub is_table: bool,
    /// Abbreviation detection is not implemented; always `false`.
    pub contains_abbreviations: bool,
}

impl Chunk {
    /// Copy the content and provenance of this chunk into a new draft.
    #[must_use]
    pub fn to_draft(&self) -> ChunkDraft {
        ChunkDraft {
            breadcrumb: self.breadcrumb.clone(),
            breadcrumb_text: self.breadcrumb_text.clone(),
            content: self.content.clone(),
            content_with_context: self.content_with_context.clone(),
            page_numbers: self.page_numbers.clone(),
            source_block_ids: self.source_block_ids.clone(),
            parent_section_id: self.parent_section_id.clone(),
            figure_references: self.figure_references.clone(),
            token_count: self.token_count,
            character_count: self.character_count,
            overlap_tokens: self.overlap_tokens,
            is_figure_caption: self.is_figure_caption,
        }
    }
}

impl Sectioned for Chunk {
    fn section_id(&self) -> &str {
        &self.parent_section_id
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ id: {}, section: {}, tokens: {}, pages: {:?} }}",
            self.chunk_id, self.parent_section_id, self.token_count, self.page_numbers
        )
    }
}

/// A chunk that has not been placed in a sequence yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    breadcrumb: Vec<String>,
    breadcrumb_text: String,
    content: String,
    content_with_context: String,
    page_numbers: Vec<u32>,
    source_block_ids: Vec<String>,
    parent_section_id: String,
    figure_references: Vec<FigureRef>,
    token_count: usize,
    character_count: usize,
    overlap_tokens: usize,
    is_figure_caption: bool,
}

impl ChunkDraft {
    /// Create a draft holding `content` under `breadcrumb`.
    ///
    /// An empty breadcrumb becomes `["Document Root"]`.
    pub fn new(breadcrumb: Vec<String>, content: impl Into<String>, tokens: &mut TokenEstimator) -> Self {
        let breadcrumb_text = format_breadcrumb(&breadcrumb);
        let breadcrumb = if breadcrumb.is_empty() {
            vec![DOCUMENT_ROOT.to_owned()]
        } else {
            breadcrumb
        };
        let mut draft = Self {
            breadcrumb,
            breadcrumb_text,
            content: String::new(),
            content_with_context: String::new(),
            page_numbers: Vec::new(),
            source_block_ids: Vec::new(),
            parent_section_id: String::new(),
            figure_references: Vec::new(),
            token_count: 0,
            character_count: 0,
            overlap_tokens: 0,
            is_figure_caption: false,
        };
        draft.set_content(content.into(), tokens);
        draft
    }

    /// Record an originating block.
    #[must_use]
    pub fn with_source_block(mut self, block_id: impl Into<String>) -> Self {
        push_unique(&mut self.source_block_ids, block_id.into());
        self
    }

    /// Record a 1-based page.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        insert_page(&mut self.page_numbers, page);
        self
    }

    /// Set the owning section.
    #[must_use]
    pub fn with_section(mut self, section_id: impl Into<String>) -> Self {
        self.parent_section_id = section_id.into();
        self
    }

    /// Mark the draft as a figure caption.
    #[must_use]
    pub fn with_figure_caption(mut self, is_figure_caption: bool) -> Self {
        self.is_figure_caption = is_figure_caption;
        self
    }

    /// Append figure references not already present.
    pub fn add_figure_references(&mut self, refs: impl IntoIterator<Item = FigureRef>) {
        for figure in refs {
            if !self
                .figure_references
                .iter()
                .any(|known| known.figure_id == figure.figure_id)
            {
                self.figure_references.push(figure);
            }
        }
    }

    /// A copy of this draft with `overlap` prepended to its content.
    #[must_use]
    pub fn with_overlap(&self, overlap: &str, tokens: &mut TokenEstimator) -> Self {
        let mut draft = self.clone();
        draft.set_content(format!("{overlap} {}", self.content), tokens);
        draft.overlap_tokens = tokens.estimate(overlap);
        draft
    }

    /// Append `other` to this draft.
    ///
    /// Content is joined with a blank line. Block ids, pages and figure
    /// references are unioned and this draft's breadcrumb is kept.
    ///
    /// When `other` opens with overlap copied from the end of this draft, that
    /// prefix is dropped so the merged text never repeats itself, and the
    /// overlap count stays this draft's. Any other overlap `other` carries is
    /// still inside the merged text and is added to the count.
    pub fn absorb(&mut self, other: &Self, tokens: &mut TokenEstimator) {
        let body = match self.own_tail_in(other, tokens) {
            Some(body) => body,
            None => {
                self.overlap_tokens += other.overlap_tokens;
                other.content.as_str()
            }
        };
        let content = format!("{}\n\n{body}", self.content);
        self.set_content(content, tokens);
        for id in &other.source_block_ids {
            push_unique(&mut self.source_block_ids, id.clone());
        }
        for &page in &other.page_numbers {
            insert_page(&mut self.page_numbers, page);
        }
        self.add_figure_references(other.figure_references.iter().cloned());
    }

    /// The rest of `other`'s content, if it opens with this draft's trailing
    /// sentences as overlap.
    fn own_tail_in<'a>(&self, other: &'a Self, tokens: &mut TokenEstimator) -> Option<&'a str> {
        if other.overlap_tokens == 0 || self.parent_section_id != other.parent_section_id {
            return None;
        }
        let sentences = split_sentences(&self.content);
        (1..=sentences.len()).find_map(|n| {
            let tail = sentences[sentences.len() - n..].join(" ");
            let body = other.content.strip_prefix(tail.as_str())?.strip_prefix(' ')?;
            (tokens.estimate(&tail) == other.overlap_tokens).then_some(body)
        })
    }

    fn set_content(&mut self, content: String, tokens: &mut TokenEstimator) {
        self.content_with_context = format!("{}\n\n{content}", self.breadcrumb_text);
        self.token_count = tokens.estimate(&self.content_with_context);
        self.character_count = self.content_with_context.chars().count();
        self.content = content;
    }

    /// Ancestor header labels.
    #[must_use]
    pub fn breadcrumb(&self) -> &[String] {
        &self.breadcrumb
    }

    /// Rendered breadcrumb.
    #[must_use]
    pub fn breadcrumb_text(&self) -> &str {
        &self.breadcrumb_text
    }

    /// The draft's own text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Breadcrumb and content as embedded.
    #[must_use]
    pub fn content_with_context(&self) -> &str {
        &self.content_with_context
    }

    /// Sorted 1-based pages.
    #[must_use]
    pub fn page_numbers(&self) -> &[u32] {
        &self.page_numbers
    }

    /// Originating block ids.
    #[must_use]
    pub fn source_block_ids(&self) -> &[String] {
        &self.source_block_ids
    }

    /// Linked figures.
    #[must_use]
    pub fn figure_references(&self) -> &[FigureRef] {
        &self.figure_references
    }

    /// Estimated tokens of the content with context.
    #[must_use]
    pub const fn token_count(&self) -> usize {
        self.token_count
    }

    /// Tokens contributed by overlap.
    #[must_use]
    pub const fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Whether this is a figure caption.
    #[must_use]
    pub const fn is_figure_caption(&self) -> bool {
        self.is_figure_caption
    }
}

impl Sectioned for ChunkDraft {
    fn section_id(&self) -> &str {
        &self.parent_section_id
    }
}

fn push_unique(ids: &mut Vec<String>, id: String) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn insert_page(pages: &mut Vec<u32>, page: u32) {
    if let Err(position) = pages.binary_search(&page) {
        pages.insert(position, page);
    }
}

/// The id of chunk `sequence` in `document_id`.
///
/// ```rust
/// assert_eq!(quarry::chunk_id("neuro", 7), "neuro-chunk-0007");
/// assert_eq!(quarry::chunk_id("neuro", 12345), "neuro-chunk-12345");
/// ```
#[must_use]
pub fn chunk_id(document_id: &str, sequence: usize) -> String {
    format!("{document_id}-chunk-{sequence:04}")
}

/// Number `drafts` from 0 and link them in order.
#[must_use]
pub fn finalize_sequence(drafts: Vec<ChunkDraft>, document_id: &str) -> Vec<Chunk> {
    let ids: Vec<String> = (0..drafts.len()).map(|i| chunk_id(document_id, i)).collect();

    drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| Chunk {
            chunk_id: ids[i].clone(),
            breadcrumb: draft.breadcrumb,
            breadcrumb_text: draft.breadcrumb_text,
            content: draft.content,
            content_with_context: draft.content_with_context,
            page_numbers: draft.page_numbers,
            source_block_ids: draft.source_block_ids,
            sequence_number: i,
            previous_chunk_id: i.checked_sub(1).map(|prev| ids[prev].clone()),
            next_chunk_id: ids.get(i + 1).cloned(),
            parent_section_id: draft.parent_section_id,
            figure_references: draft.figure_references,
            token_count: draft.token_count,
            character_count: draft.character_count,
            overlap_tokens: draft.overlap_tokens,
            is_figure_caption: draft.is_figure_caption,
            is_table: false,
            contains_abbreviations: false,
        })
        .collect()
}

/// Check the invariants every stage must leave behind.
///
/// # Errors
///
/// - [`Error::EmptySourceBlocks`] for a chunk without provenance.
/// - [`Error::TokenCeilingExceeded`] for a chunk above `budget.hard_max()`.
/// - [`Error::DuplicateChunkId`] for a repeated id.
/// - [`Error::BrokenSequence`] for an empty breadcrumb, a context mismatch,
///   a numbering gap or a bad link.
pub fn verify_sequence(chunks: &[Chunk], budget: &TokenBudget) -> Result<()> {
    let mut seen = HashSet::with_capacity(chunks.len());
    for chunk in chunks {
        if !seen.insert(chunk.chunk_id.as_str()) {
            return Err(Error::DuplicateChunkId(chunk.chunk_id.clone()));
        }
    }

    let broken = |chunk: &Chunk, reason: &str| Error::BrokenSequence {
        chunk_id: chunk.chunk_id.clone(),
        reason: reason.to_owned(),
    };

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.source_block_ids.is_empty() {
            return Err(Error::EmptySourceBlocks {
                chunk_id: chunk.chunk_id.clone(),
            });
        }
        if !budget.fits_hard(chunk.token_count) {
            return Err(Error::TokenCeilingExceeded {
                chunk_id: chunk.chunk_id.clone(),
                tokens: chunk.token_count,
                ceiling: budget.hard_max(),
            });
        }
        if chunk.breadcrumb.is_empty() {
            return Err(broken(chunk, "empty breadcrumb"));
        }
        if chunk.content_with_context != format!("{}\n\n{}", chunk.breadcrumb_text, chunk.content) {
            return Err(broken(chunk, "content_with_context does not match breadcrumb and content"));
        }
        if chunk.sequence_number != i {
            return Err(broken(chunk, "sequence number out of order"));
        }
        let expected_previous = i.checked_sub(1).map(|prev| chunks[prev].chunk_id.as_str());
        if chunk.previous_chunk_id.as_deref() != expected_previous {
            return Err(broken(chunk, "previous_chunk_id does not match sequence"));
        }
        let expected_next = chunks.get(i + 1).map(|next| next.chunk_id.as_str());
        if chunk.next_chunk_id.as_deref() != expected_next {
            return Err(broken(chunk, "next_chunk_id does not match sequence"));
        }
    }

    Ok(())
}
