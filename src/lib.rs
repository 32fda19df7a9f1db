//! # quarry
//!
//! Hierarchy-aware chunking of structured documents for retrieval-augmented
//! generation (RAG) pipelines.
//!
//! ## The Problem
//!
//! A chunk retrieved on its own has lost its surroundings. "They drain into
//! the sinus" means little without knowing it sits under *The Cerebral Veins*,
//! and a figure caption cut off from the text that cites it is half an answer.
//!
//! Splitting every N characters ignores all of that. quarry works on a tree
//! of typed content blocks (headers, text, figure captions) as produced by a
//! layout analyser, and every chunk it emits carries:
//!
//! - its **breadcrumb**, the chain of section headers above it, rendered into
//!   the embedded text
//! - its **neighbours**, as a doubly linked list in reading order
//! - its **figures**, both the one it captions and the ones it cites
//! - its **provenance**, pages and source block ids
//!
//! ## Pipeline
//!
//! ```text
//! Document + FigureIndex
//!        │
//!        ▼
//!   assemble   one block -> one or more chunks, split at paragraph,
//!        │     sentence, then word boundaries under the token budget
//!        ▼
//!   overlap    prefix each chunk with its predecessor's last 2 sentences
//!        │     (same section only, never captions, never past the ceiling)
//!        ▼
//!   merge      fold small chunks backward, then section openers forward
//!        │
//!        ▼
//!   index      by section, by page, by figure
//!        │
//!        ▼
//!   validate   seven quality gates -> ValidationReport
//! ```
//!
//! ## Token Budget
//!
//! | Limit | Default | Meaning |
//! |-------|---------|---------|
//! | `min` | 80 | chunks below this are merge candidates |
//! | `soft_max` | 512 | splitting and merging target |
//! | `hard_max` | 600 | nothing may exceed this, overlap included |
//!
//! Tokens are estimated as `ceil(chars / 4)`; see [`estimate_tokens`].
//!
//! ## Quick Start
//!
//! ```rust
//! use quarry::{BlockKind, ContentBlock, Document, FigureIndex, Pipeline, StructuralSchema};
//!
//! let doc = Document::new("neuro").with_page(vec![
//!     ContentBlock::new("p0-section_header-0", BlockKind::SectionHeader, 0, "THE CEREBRAL VEINS"),
//!     ContentBlock::new("p0-text-1", BlockKind::Text, 0, "The cerebral veins drain the brain.")
//!         .with_ancestors(["p0-section_header-0"]),
//! ]);
//!
//! let (output, report) = Pipeline::default().process(&doc, &FigureIndex::default(), &StructuralSchema)?;
//!
//! assert_eq!(output.chunks[0].chunk_id, "neuro-chunk-0000");
//! assert_eq!(
//!     output.chunks[0].content_with_context,
//!     "[Context: THE CEREBRAL VEINS]\n\nThe cerebral veins drain the brain."
//! );
//! println!("{report}");
//! # Ok::<(), quarry::Error>(())
//! ```
//!
//! The stages are also usable one at a time: [`assemble`],
//! [`OverlapEngine::apply`], [`MergeEngine::apply`], [`ChunkIndex::build`] and
//! [`Validator::validate`].

mod assemble;
mod breadcrumb;
mod budget;
mod chunk;
mod config;
mod document;
mod error;
mod figure;
mod index;
mod merge;
mod overlap;
mod pipeline;
mod section;
mod sentence;
mod split;
mod tokens;
mod validate;

pub use assemble::assemble;
pub use breadcrumb::{format_breadcrumb, BreadcrumbResolver, DOCUMENT_ROOT};
pub use budget::{TokenBudget, TokenBudgetError, HARD_MAX_TOKENS, MAX_TOKENS, MIN_TOKENS};
pub use chunk::{chunk_id, finalize_sequence, verify_sequence, Chunk, ChunkDraft};
pub use config::ChunkingConfig;
pub use document::{BlockKind, ContentBlock, Document, Page};
pub use error::{Error, Result};
pub use figure::{caption_snippet, Figure, FigureIndex, FigureRef, SNIPPET_MAX_CHARS};
pub use index::ChunkIndex;
pub use merge::MergeEngine;
pub use overlap::{OverlapEngine, DEFAULT_OVERLAP_SENTENCES};
pub use pipeline::{ChunkedDocument, Pipeline, SchemaValidator, StructuralSchema};
pub use section::{is_section_final, opens_section, same_section, Sectioned};
pub use sentence::{last_sentences, split_sentences, ABBREVIATIONS};
pub use split::Splitter;
pub use tokens::{estimate_tokens, TokenEstimator, CHARS_PER_TOKEN, DEFAULT_CACHE_CAPACITY};
pub use validate::{ChunkStats, Gate, GateResult, ValidationInputs, ValidationReport, Validator};
