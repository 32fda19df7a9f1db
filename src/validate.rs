//! Fourth pass: quality gates over the finished chunk set.
//!
//! | Gate | Passes when |
//! |------|-------------|
//! | content coverage | distinct source blocks == eligible source blocks |
//! | max token limit | every chunk <= hard ceiling |
//! | min token check | small chunks (captions and section tails excused) < 1% of all chunks |
//! | breadcrumb coverage | every chunk has a breadcrumb |
//! | figure captions | caption chunks >= expected captions |
//! | schema validation | the external schema check passed |
//! | processing time | elapsed < 30 s |
//!
//! A failing gate never aborts processing; it is reported and the caller
//! decides what an overall failure means.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::TokenBudget;
use crate::chunk::Chunk;
use crate::config::ChunkingConfig;
use crate::document::{BlockKind, Document};
use crate::figure::FigureIndex;
use crate::section::is_section_final;

/// One named quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Every eligible block is represented, and nothing else.
    ContentCoverage,
    /// No chunk exceeds the hard ceiling.
    MaxTokenLimit,
    /// Almost no unexcused small chunks.
    MinTokenCheck,
    /// Every chunk carries a breadcrumb.
    BreadcrumbCoverage,
    /// Enough figure-caption chunks.
    FigureCaptions,
    /// External structural validation.
    SchemaValidation,
    /// Wall-clock budget.
    ProcessingTime,
}

impl Gate {
    /// Every gate, in report order.
    pub const ALL: [Self; 7] = [
        Self::ContentCoverage,
        Self::MaxTokenLimit,
        Self::MinTokenCheck,
        Self::BreadcrumbCoverage,
        Self::FigureCaptions,
        Self::SchemaValidation,
        Self::ProcessingTime,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ContentCoverage => "content_coverage",
            Self::MaxTokenLimit => "max_token_limit",
            Self::MinTokenCheck => "min_token_check",
            Self::BreadcrumbCoverage => "breadcrumb_coverage",
            Self::FigureCaptions => "figure_captions",
            Self::SchemaValidation => "schema_validation",
            Self::ProcessingTime => "processing_time",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Which gate.
    pub gate: Gate,
    /// Whether it passed.
    pub passed: bool,
    /// Human-readable measurement.
    pub detail: String,
}

impl GateResult {
    fn new(gate: Gate, passed: bool, detail: String) -> Self {
        Self { gate, passed, detail }
    }
}

/// Facts about the run supplied from outside the chunk set.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationInputs {
    /// Blocks that should each appear in some chunk.
    pub source_block_count: usize,
    /// Figure captions that should each have a chunk.
    pub expected_figure_captions: usize,
    /// Result of the external schema check.
    pub schema_valid: bool,
    /// Wall-clock time the run took.
    pub processing_time: Duration,
}

impl ValidationInputs {
    /// Derive the counts from the inputs the chunks were built from.
    ///
    /// Source blocks are the chunkable blocks. Expected captions are the known
    /// figures whose caption block is a chunkable caption block.
    #[must_use]
    pub fn for_document(
        document: &Document,
        figures: &FigureIndex,
        processing_time: Duration,
        schema_valid: bool,
    ) -> Self {
        let caption_blocks: HashSet<&str> = document
            .chunkable_blocks()
            .filter(|block| block.kind == BlockKind::FigureCaption)
            .map(|block| block.id.as_str())
            .collect();
        let expected_figure_captions = figures
            .figures()
            .iter()
            .filter(|figure| caption_blocks.contains(figure.caption_block_id.as_str()))
            .count();

        Self {
            source_block_count: document.chunkable_block_count(),
            expected_figure_captions,
            schema_valid,
            processing_time,
        }
    }
}

/// Summary statistics of a chunk set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStats {
    /// Number of chunks.
    pub total_chunks: usize,
    /// Chunks flagged as figure captions.
    pub figure_caption_chunks: usize,
    /// Largest token count.
    pub max_token_count: usize,
    /// Mean token count, 0 for an empty set.
    pub avg_token_count: f64,
    /// Chunks carrying overlap.
    pub chunks_with_overlap: usize,
}

impl ChunkStats {
    /// Measure `chunks`.
    #[must_use]
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let total_tokens: usize = chunks.iter().map(|c| c.token_count).sum();
        Self {
            total_chunks: chunks.len(),
            figure_caption_chunks: chunks.iter().filter(|c| c.is_figure_caption).count(),
            max_token_count: chunks.iter().map(|c| c.token_count).max().unwrap_or(0),
            avg_token_count: if chunks.is_empty() {
                0.0
            } else {
                total_tokens as f64 / chunks.len() as f64
            },
            chunks_with_overlap: chunks.iter().filter(|c| c.overlap_tokens > 0).count(),
        }
    }
}

/// All gate results for one chunk set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Logical AND of every gate.
    pub passed: bool,
    /// Gate results in [`Gate::ALL`] order.
    pub gates: Vec<GateResult>,
    /// Summary statistics.
    pub stats: ChunkStats,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// The result for `gate`.
    #[must_use]
    pub fn gate(&self, gate: Gate) -> Option<&GateResult> {
        self.gates.iter().find(|result| result.gate == gate)
    }

    /// Gates that failed.
    pub fn failures(&self) -> impl Iterator<Item = &GateResult> {
        self.gates.iter().filter(|result| !result.passed)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.gates {
            let mark = if result.passed { "PASS" } else { "FAIL" };
            writeln!(f, "[{mark}] {}: {}", result.gate, result.detail)?;
        }
        write!(
            f,
            "overall: {} | chunks: {}, figure captions: {}, max tokens: {}, avg tokens: {:.1}, with overlap: {}",
            if self.passed { "PASS" } else { "FAIL" },
            self.stats.total_chunks,
            self.stats.figure_caption_chunks,
            self.stats.max_token_count,
            self.stats.avg_token_count,
            self.stats.chunks_with_overlap,
        )
    }
}

/// Evaluates the quality gates.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    budget: TokenBudget,
    max_processing_secs: f64,
    min_token_tolerance_percent: f64,
}

impl Validator {
    /// Use the thresholds in `config`.
    #[must_use]
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            budget: config.budget,
            max_processing_secs: config.max_processing_secs,
            min_token_tolerance_percent: config.min_token_tolerance_percent,
        }
    }

    /// Run every gate over `chunks`.
    #[must_use]
    pub fn validate(&self, chunks: &[Chunk], inputs: &ValidationInputs) -> ValidationReport {
        let gates = vec![
            Self::content_coverage(chunks, inputs.source_block_count),
            self.max_token_limit(chunks),
            self.min_token_check(chunks),
            Self::breadcrumb_coverage(chunks),
            Self::figure_captions(chunks, inputs.expected_figure_captions),
            Self::schema_validation(inputs.schema_valid),
            self.processing_time(inputs.processing_time),
        ];
        let passed = gates.iter().all(|result| result.passed);

        for failed in gates.iter().filter(|result| !result.passed) {
            tracing::warn!(gate = %failed.gate, detail = %failed.detail, "quality gate failed");
        }
        tracing::info!(passed, chunks = chunks.len(), "validated chunk set");

        ValidationReport {
            passed,
            gates,
            stats: ChunkStats::from_chunks(chunks),
            generated_at: Utc::now(),
        }
    }

    fn content_coverage(chunks: &[Chunk], source_block_count: usize) -> GateResult {
        let covered: HashSet<&str> = chunks
            .iter()
            .flat_map(|c| c.source_block_ids.iter().map(String::as_str))
            .collect();
        let percent = percent_of(covered.len(), source_block_count);
        GateResult::new(
            Gate::ContentCoverage,
            covered.len() == source_block_count,
            format!(
                "{percent:.2}% ({} distinct blocks covered, {source_block_count} expected)",
                covered.len()
            ),
        )
    }

    fn max_token_limit(&self, chunks: &[Chunk]) -> GateResult {
        let max = chunks.iter().map(|c| c.token_count).max().unwrap_or(0);
        GateResult::new(
            Gate::MaxTokenLimit,
            self.budget.fits_hard(max),
            format!("max {max} tokens (limit {})", self.budget.hard_max()),
        )
    }

    fn min_token_check(&self, chunks: &[Chunk]) -> GateResult {
        // Excused chunks drop out of the count, not out of the denominator.
        let small = chunks
            .iter()
            .enumerate()
            .filter(|&(i, chunk)| {
                self.budget.is_small(chunk.token_count)
                    && !chunk.is_figure_caption
                    && !is_section_final(chunks, i)
            })
            .count();
        let percent = if chunks.is_empty() {
            0.0
        } else {
            small as f64 / chunks.len() as f64 * 100.0
        };
        GateResult::new(
            Gate::MinTokenCheck,
            percent < self.min_token_tolerance_percent,
            format!(
                "{percent:.2}% below {} tokens ({small} of {}, limit {}%)",
                self.budget.min(),
                chunks.len(),
                self.min_token_tolerance_percent
            ),
        )
    }

    fn breadcrumb_coverage(chunks: &[Chunk]) -> GateResult {
        let with_breadcrumb = chunks.iter().filter(|c| !c.breadcrumb.is_empty()).count();
        let percent = percent_of(with_breadcrumb, chunks.len());
        GateResult::new(
            Gate::BreadcrumbCoverage,
            with_breadcrumb == chunks.len(),
            format!("{percent:.2}% ({with_breadcrumb} of {})", chunks.len()),
        )
    }

    fn figure_captions(chunks: &[Chunk], expected: usize) -> GateResult {
        let found = chunks.iter().filter(|c| c.is_figure_caption).count();
        GateResult::new(
            Gate::FigureCaptions,
            found >= expected,
            format!("{found} caption chunks ({expected} expected)"),
        )
    }

    fn schema_validation(schema_valid: bool) -> GateResult {
        let detail = if schema_valid {
            "schema check passed"
        } else {
            "schema check failed"
        };
        GateResult::new(Gate::SchemaValidation, schema_valid, detail.to_owned())
    }

    fn processing_time(&self, elapsed: Duration) -> GateResult {
        let secs = elapsed.as_secs_f64();
        GateResult::new(
            Gate::ProcessingTime,
            secs < self.max_processing_secs,
            format!("{secs:.2}s (limit {:.2}s)", self.max_processing_secs),
        )
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

/// `part / whole` in percent; an empty whole counts as complete when the
/// part is empty too.
fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        if part == 0 {
            100.0
        } else {
            f64::INFINITY
        }
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
