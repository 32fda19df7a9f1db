//! Token budget configuration.
//!
//! ## Soft vs Hard
//!
//! Every chunk is measured in estimated tokens (see
//! [`estimate_tokens`](crate::estimate_tokens)). Three limits govern how much
//! text a chunk may hold:
//!
//! ```text
//!   0 ........ min ............. soft_max ....... hard_max
//!   |  small   |    preferred     |   tolerated    |  never
//!        80             512               600
//! ```
//!
//! - `soft_max`: what the splitter and merger aim for. Splitting budgets
//!   content against it; merging never produces a chunk above it.
//! - `hard_max`: the absolute ceiling. Overlap may push a chunk past the soft
//!   limit but is discarded rather than crossing this one.
//! - `min`: chunks below it are "small" and are candidates for merging.

use serde::{Deserialize, Serialize};

/// Default minimum tokens before a chunk counts as small.
pub const MIN_TOKENS: usize = 80;

/// Default soft target for chunk size.
pub const MAX_TOKENS: usize = 512;

/// Default hard ceiling for chunk size.
pub const HARD_MAX_TOKENS: usize = 600;

/// Token limits shared by the splitter, overlap, merge and validation stages.
///
/// # Examples
///
/// ```rust
/// use quarry::TokenBudget;
///
/// let budget = TokenBudget::default();
/// assert_eq!(budget.min(), 80);
/// assert_eq!(budget.soft_max(), 512);
/// assert_eq!(budget.hard_max(), 600);
///
/// assert!(budget.is_small(79));
/// assert!(budget.fits_soft(512));
/// assert!(!budget.fits_soft(513));
/// assert!(budget.fits_hard(600));
///
/// assert!(TokenBudget::new(100, 50, 600).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBudget", into = "RawBudget")]
pub struct TokenBudget {
    min: usize,
    soft_max: usize,
    hard_max: usize,
}

impl TokenBudget {
    /// Create a budget.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < soft_max`, `min <= soft_max` and
    /// `soft_max <= hard_max`.
    pub fn new(min: usize, soft_max: usize, hard_max: usize) -> Result<Self, TokenBudgetError> {
        if soft_max == 0 {
            return Err(TokenBudgetError::ZeroSoftMax);
        }
        if min > soft_max {
            return Err(TokenBudgetError::MinAboveSoftMax { min, soft_max });
        }
        if hard_max < soft_max {
            return Err(TokenBudgetError::HardMaxBelowSoftMax { soft_max, hard_max });
        }
        Ok(Self {
            min,
            soft_max,
            hard_max,
        })
    }

    /// Chunks below this are small.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// The target the splitter and merger work against.
    #[must_use]
    pub const fn soft_max(&self) -> usize {
        self.soft_max
    }

    /// The ceiling no chunk may exceed.
    #[must_use]
    pub const fn hard_max(&self) -> usize {
        self.hard_max
    }

    /// Whether `tokens` is below the minimum.
    #[must_use]
    pub const fn is_small(&self, tokens: usize) -> bool {
        tokens < self.min
    }

    /// Whether `tokens` fits within the soft target.
    #[must_use]
    pub const fn fits_soft(&self, tokens: usize) -> bool {
        tokens <= self.soft_max
    }

    /// Whether `tokens` fits within the hard ceiling.
    #[must_use]
    pub const fn fits_hard(&self, tokens: usize) -> bool {
        tokens <= self.hard_max
    }

    /// Content budget left under the soft target after reserving `reserved`
    /// tokens (typically the breadcrumb).
    #[must_use]
    pub const fn available_after(&self, reserved: usize) -> usize {
        self.soft_max.saturating_sub(reserved)
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            min: MIN_TOKENS,
            soft_max: MAX_TOKENS,
            hard_max: HARD_MAX_TOKENS,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawBudget {
    min: usize,
    soft_max: usize,
    hard_max: usize,
}

impl TryFrom<RawBudget> for TokenBudget {
    type Error = TokenBudgetError;

    fn try_from(raw: RawBudget) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.soft_max, raw.hard_max)
    }
}

impl From<TokenBudget> for RawBudget {
    fn from(budget: TokenBudget) -> Self {
        Self {
            min: budget.min,
            soft_max: budget.soft_max,
            hard_max: budget.hard_max,
        }
    }
}

/// Error when configuring a token budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenBudgetError {
    /// The soft target must be positive.
    #[error("soft_max must be > 0")]
    ZeroSoftMax,

    /// The minimum must not exceed the soft target.
    #[error("min ({min}) must be <= soft_max ({soft_max})")]
    MinAboveSoftMax {
        /// The requested minimum.
        min: usize,
        /// The soft target it exceeded.
        soft_max: usize,
    },

    /// The hard ceiling must be at least the soft target.
    #[error("hard_max ({hard_max}) must be >= soft_max ({soft_max})")]
    HardMaxBelowSoftMax {
        /// The soft target.
        soft_max: usize,
        /// The ceiling that was too small.
        hard_max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let budget = TokenBudget::default();
        assert_eq!(budget.min(), MIN_TOKENS);
        assert_eq!(budget.soft_max(), MAX_TOKENS);
        assert_eq!(budget.hard_max(), HARD_MAX_TOKENS);
    }

    #[test]
    fn test_boundaries() {
        let budget = TokenBudget::default();
        assert!(budget.is_small(79));
        assert!(!budget.is_small(80));
        assert!(budget.fits_soft(512));
        assert!(!budget.fits_soft(513));
        assert!(budget.fits_hard(600));
        assert!(!budget.fits_hard(601));
    }

    #[test]
    fn test_available_after() {
        let budget = TokenBudget::default();
        assert_eq!(budget.available_after(12), 500);
        assert_eq!(budget.available_after(1000), 0);
    }

    #[test]
    fn test_invalid_budgets() {
        assert_eq!(TokenBudget::new(0, 0, 10), Err(TokenBudgetError::ZeroSoftMax));
        assert!(matches!(
            TokenBudget::new(100, 50, 600),
            Err(TokenBudgetError::MinAboveSoftMax { .. })
        ));
        assert!(matches!(
            TokenBudget::new(10, 500, 400),
            Err(TokenBudgetError::HardMaxBelowSoftMax { .. })
        ));
    }

    #[test]
    fn test_equal_soft_and_hard_allowed() {
        let budget = TokenBudget::new(10, 100, 100).unwrap();
        assert_eq!(budget.soft_max(), budget.hard_max());
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_budget() {
        let err = serde_json::from_str::<TokenBudget>(r#"{"min":90,"soft_max":50,"hard_max":60}"#);
        assert!(err.is_err());

        let ok: TokenBudget =
            serde_json::from_str(r#"{"min":10,"soft_max":50,"hard_max":60}"#).unwrap();
        assert_eq!(ok.hard_max(), 60);
    }
}
