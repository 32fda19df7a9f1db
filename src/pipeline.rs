//! End-to-end orchestration.
//!
//! ```text
//! Document ─► assemble ─► overlap ─► merge ─► index ─► ChunkedDocument
//!                │           │         │        │
//!                └─ verify ──┴─ verify ┴─ verify┘
//! ```
//!
//! Every stage consumes the previous sequence and returns a new one. The
//! sequence invariants are re-checked after each stage, so a corrupt sequence
//! is reported where it arose rather than at the end.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assemble::assemble;
use crate::chunk::{verify_sequence, Chunk};
use crate::config::ChunkingConfig;
use crate::document::Document;
use crate::figure::FigureIndex;
use crate::index::ChunkIndex;
use crate::merge::MergeEngine;
use crate::overlap::OverlapEngine;
use crate::split::Splitter;
use crate::tokens::TokenEstimator;
use crate::validate::{ValidationInputs, ValidationReport, Validator};
use crate::Result;

/// The output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    /// Source document id.
    pub document_id: String,
    /// The final, linked chunk sequence.
    pub chunks: Vec<Chunk>,
    /// Lookups over `chunks`.
    pub index: ChunkIndex,
    /// Configuration the run used.
    pub config: ChunkingConfig,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
}

impl ChunkedDocument {
    /// Re-check the sequence invariants and the index.
    ///
    /// # Errors
    ///
    /// Any error [`verify_sequence`] or [`ChunkIndex::verify`] raises.
    pub fn verify(&self) -> Result<()> {
        verify_sequence(&self.chunks, &self.config.budget)?;
        self.index.verify(&self.chunks)
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a previously serialized output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// External structural check feeding the schema gate.
///
/// Any `Fn(&ChunkedDocument) -> bool` is a validator:
///
/// ```rust
/// use quarry::{ChunkedDocument, Document, FigureIndex, Pipeline};
///
/// let non_empty = |output: &ChunkedDocument| !output.chunks.is_empty();
/// let (_, report) = Pipeline::default().process(&Document::new("empty"), &FigureIndex::default(), &non_empty)?;
/// assert!(!report.passed);
/// # Ok::<(), quarry::Error>(())
/// ```
pub trait SchemaValidator {
    /// Whether `output` is structurally acceptable.
    fn validate(&self, output: &ChunkedDocument) -> bool;
}

impl<F> SchemaValidator for F
where
    F: Fn(&ChunkedDocument) -> bool,
{
    fn validate(&self, output: &ChunkedDocument) -> bool {
        self(output)
    }
}

/// Accepts any output that passes [`ChunkedDocument::verify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSchema;

impl SchemaValidator for StructuralSchema {
    fn validate(&self, output: &ChunkedDocument) -> bool {
        match output.verify() {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "structural schema check failed");
                false
            }
        }
    }
}

/// Runs the stages over one document at a time.
///
/// The pipeline owns its token cache and clears it at the start of every
/// run, so documents never share estimates.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ChunkingConfig,
    tokens: TokenEstimator,
}

impl Pipeline {
    /// Build a pipeline for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// config is out of range.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        let tokens = TokenEstimator::new(config.token_cache_capacity);
        Ok(Self { config, tokens })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk `document`.
    ///
    /// # Errors
    ///
    /// Structural failures from any stage: malformed hierarchy, a breadcrumb
    /// that leaves no content budget, or a broken sequence or index.
    pub fn run(&mut self, document: &Document, figures: &FigureIndex) -> Result<ChunkedDocument> {
        let budget = self.config.budget;
        self.tokens.clear();

        let splitter = Splitter::new(budget);
        let assembled = assemble(document, figures, &splitter, &mut self.tokens)?;
        verify_sequence(&assembled, &budget)?;

        let overlap = OverlapEngine::new(budget, self.config.overlap_sentences);
        let overlapped = overlap.apply(&assembled, &document.id, &mut self.tokens);
        verify_sequence(&overlapped, &budget)?;

        let merged = MergeEngine::new(budget).apply(&overlapped, &document.id, &mut self.tokens);
        verify_sequence(&merged, &budget)?;

        let index = ChunkIndex::build(&merged);
        index.verify(&merged)?;

        tracing::info!(
            document = %document.id,
            chunks = merged.len(),
            sections = index.by_section.len(),
            cached_estimates = self.tokens.len(),
            "chunked document"
        );

        Ok(ChunkedDocument {
            document_id: document.id.clone(),
            chunks: merged,
            index,
            config: self.config.clone(),
            generated_at: Utc::now(),
        })
    }

    /// Chunk `document`, then run every quality gate over the result.
    ///
    /// The processing-time gate measures the whole call, schema check
    /// included.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::run`]. Failed gates are not errors.
    pub fn process(
        &mut self,
        document: &Document,
        figures: &FigureIndex,
        schema: &impl SchemaValidator,
    ) -> Result<(ChunkedDocument, ValidationReport)> {
        let started = Instant::now();
        let output = self.run(document, figures)?;
        let schema_valid = schema.validate(&output);
        let elapsed = started.elapsed();

        let inputs = ValidationInputs::for_document(document, figures, elapsed, schema_valid);
        let report = Validator::new(&self.config).validate(&output.chunks, &inputs);
        Ok((output, report))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        let tokens = TokenEstimator::new(config.token_cache_capacity);
        Self { config, tokens }
    }
}
