//! Error types for quarry.
//!
//! Only structural failures are errors. A failing quality gate is recorded in
//! the [`ValidationReport`](crate::ValidationReport), and soft data gaps
//! (unresolved ancestors, mentions of unknown figures) are dropped.

use crate::budget::TokenBudgetError;

/// Errors that can occur while building a chunk set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A chunk ended up with no originating blocks.
    #[error("chunk {chunk_id} has no source block ids")]
    EmptySourceBlocks {
        /// The offending chunk.
        chunk_id: String,
    },

    /// A block's ancestor list cannot describe a hierarchy.
    #[error("malformed hierarchy on block {block_id}: {reason}")]
    MalformedHierarchy {
        /// The block carrying the bad ancestor list.
        block_id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The breadcrumb alone consumes the whole soft token budget.
    #[error("breadcrumb of block {block_id} needs {tokens} tokens, budget is {budget}")]
    BreadcrumbOverBudget {
        /// The block whose breadcrumb is too long.
        block_id: String,
        /// Estimated tokens of the formatted breadcrumb.
        tokens: usize,
        /// The soft budget it had to fit in.
        budget: usize,
    },

    /// A chunk exceeds the hard token ceiling.
    #[error("chunk {chunk_id} has {tokens} tokens, ceiling is {ceiling}")]
    TokenCeilingExceeded {
        /// The offending chunk.
        chunk_id: String,
        /// Its token count.
        tokens: usize,
        /// The hard ceiling.
        ceiling: usize,
    },

    /// Sequence numbering, linking or the context formula is inconsistent.
    #[error("broken chunk sequence at {chunk_id}: {reason}")]
    BrokenSequence {
        /// The chunk where the inconsistency was found.
        chunk_id: String,
        /// What is inconsistent.
        reason: String,
    },

    /// Two chunks share an id.
    #[error("duplicate chunk id: {0}")]
    DuplicateChunkId(String),

    /// Two figures share an id or a caption block.
    #[error("duplicate figure key: {0}")]
    DuplicateFigure(String),

    /// The chunk index disagrees with the chunk sequence.
    #[error("index mismatch: {0}")]
    IndexMismatch(String),

    /// Configuration values are inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Token budget construction failed.
    #[error(transparent)]
    Budget(#[from] TokenBudgetError),

    /// Input JSON could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
