//! Pipeline configuration.
//!
//! Defaults reproduce the standard limits; a JSON document may override any
//! subset of fields:
//!
//! ```json
//! { "budget": { "min": 60, "soft_max": 400, "hard_max": 480 }, "overlap_sentences": 1 }
//! ```

use serde::{Deserialize, Serialize};

use crate::budget::TokenBudget;
use crate::overlap::DEFAULT_OVERLAP_SENTENCES;
use crate::tokens::DEFAULT_CACHE_CAPACITY;
use crate::{Error, Result};

/// Every tunable of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token limits for splitting, overlap, merging and validation.
    pub budget: TokenBudget,
    /// Trailing sentences carried into the next chunk. Zero disables overlap.
    pub overlap_sentences: usize,
    /// Cached token estimates before the cache is cleared.
    pub token_cache_capacity: usize,
    /// Wall-clock limit for the processing-time gate, in seconds.
    pub max_processing_secs: f64,
    /// Share of small chunks tolerated by the min-token gate, in percent.
    pub min_token_tolerance_percent: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            budget: TokenBudget::default(),
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
            token_cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_processing_secs: 30.0,
            min_token_tolerance_percent: 1.0,
        }
    }
}

impl ChunkingConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed input (including an inconsistent
    /// budget) and [`Error::InvalidConfig`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the token budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Replace the number of overlap sentences.
    #[must_use]
    pub const fn with_overlap_sentences(mut self, sentences: usize) -> Self {
        self.overlap_sentences = sentences;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the cache capacity is zero or a
    /// threshold is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.token_cache_capacity == 0 {
            return Err(Error::InvalidConfig("token_cache_capacity must be > 0".into()));
        }
        if !(self.max_processing_secs.is_finite() && self.max_processing_secs > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "max_processing_secs must be positive, got {}",
                self.max_processing_secs
            )));
        }
        if !(self.min_token_tolerance_percent.is_finite() && self.min_token_tolerance_percent > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_token_tolerance_percent must be positive, got {}",
                self.min_token_tolerance_percent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChunkingConfig::default();
        assert_eq!(config.budget, TokenBudget::default());
        assert_eq!(config.overlap_sentences, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ChunkingConfig::from_json_str(r#"{"overlap_sentences": 1}"#).unwrap();
        assert_eq!(config.overlap_sentences, 1);
        assert_eq!(config.budget.soft_max(), 512);
        assert!((config.max_processing_secs - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_budget_from_json() {
        let config = ChunkingConfig::from_json_str(
            r#"{"budget": {"min": 60, "soft_max": 400, "hard_max": 480}}"#,
        )
        .unwrap();
        assert_eq!(config.budget.min(), 60);
        assert_eq!(config.budget.hard_max(), 480);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ChunkingConfig::from_json_str(r#"{"token_cache_capacity": 0}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ChunkingConfig::from_json_str(r#"{"max_processing_secs": -1.0}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ChunkingConfig::from_json_str(r#"{"budget": {"min": 900, "soft_max": 512, "hard_max": 600}}"#),
            Err(Error::Json(_))
        ));
    }
}
