//! Token estimation.
//!
//! Chunk sizes are measured with a fixed ratio of four characters per token,
//! rounded up. It is not a tokenizer: real subword counts vary by model. What
//! the heuristic does guarantee is determinism, monotonicity (longer text never
//! estimates lower) and that a non-empty string always costs at least one token.
//!
//! ```text
//! "The cerebral veins drain the brain."   35 chars  ->  ceil(35 / 4) = 9
//! ""                                       0 chars  ->  0
//! ```

use std::collections::HashMap;

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default number of cached estimates before the cache is cleared.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Estimate tokens for `text` without caching.
///
/// Counts Unicode scalar values, not bytes.
///
/// ```rust
/// use quarry::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Memoizing token estimator.
///
/// Owned by one pipeline invocation. When the cache grows past its capacity it
/// is cleared wholesale and starts again.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    cache: HashMap<String, usize>,
    capacity: usize,
}

impl TokenEstimator {
    /// Create an estimator that caches up to `capacity` entries.
    ///
    /// A capacity of zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: HashMap::new(),
            capacity,
        }
    }

    /// Estimate tokens for `text`, consulting the cache first.
    pub fn estimate(&mut self, text: &str) -> usize {
        if let Some(&tokens) = self.cache.get(text) {
            return tokens;
        }
        let tokens = estimate_tokens(text);
        if self.capacity == 0 {
            return tokens;
        }
        if self.cache.len() >= self.capacity {
            tracing::trace!(entries = self.cache.len(), "token cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(text.to_owned(), tokens);
        tokens
    }

    /// Drop every cached estimate.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of cached estimates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Maximum cached entries before a clear.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_division() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(2400)), 600);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // 4 chars, 12 bytes
        assert_eq!(estimate_tokens("日本語字"), 1);
    }

    #[test]
    fn test_cache_hit_matches_uncached() {
        let mut tokens = TokenEstimator::new(8);
        let text = "The cerebral veins drain the brain.";
        assert_eq!(tokens.estimate(text), estimate_tokens(text));
        assert_eq!(tokens.estimate(text), estimate_tokens(text));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_cache_clears_when_full() {
        let mut tokens = TokenEstimator::new(3);
        for text in ["a", "bb", "ccc"] {
            tokens.estimate(text);
        }
        assert_eq!(tokens.len(), 3);

        tokens.estimate("dddd");
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_zero_capacity_never_caches() {
        let mut tokens = TokenEstimator::new(0);
        assert_eq!(tokens.estimate("abcdefgh"), 2);
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_explicit_clear() {
        let mut tokens = TokenEstimator::default();
        tokens.estimate("hello");
        tokens.clear();
        assert!(tokens.is_empty());
        assert_eq!(tokens.capacity(), DEFAULT_CACHE_CAPACITY);
    }
}
