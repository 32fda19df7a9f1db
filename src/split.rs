//! Budget-aware recursive splitting of one block.
//!
//! ## The Algorithm
//!
//! The breadcrumb is rendered into every chunk, so it is paid for first:
//!
//! ```text
//! available = soft_max - tokens("[Context: ...]\n\n")
//! ```
//!
//! Then the block is cut at the coarsest boundary that fits:
//!
//! ```text
//! 1. Whole block fits?            -> one chunk
//! 2. Split on blank lines         -> pack paragraphs greedily
//! 3. Paragraph still too big?     -> pack its sentences greedily
//! 4. Sentence still too big?      -> pack its words greedily
//! 5. Single word still too big?   -> cut it on character boundaries
//! ```
//!
//! Packing is greedy: units are appended to the current piece until the next
//! one would break the budget, then the piece is flushed. A unit that alone
//! breaks the budget flushes the current piece and is handed one level down.
//! Step 5 only triggers for pathological input (a "word" of thousands of
//! characters) and guarantees termination.

use std::sync::LazyLock;

use regex::Regex;

use crate::breadcrumb::format_breadcrumb;
use crate::budget::TokenBudget;
use crate::chunk::ChunkDraft;
use crate::document::{BlockKind, ContentBlock};
use crate::sentence::split_sentences;
use crate::tokens::{TokenEstimator, CHARS_PER_TOKEN};
use crate::{Error, Result};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph break regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Paragraph,
    Sentence,
    Word,
}

impl Level {
    const fn separator(self) -> &'static str {
        match self {
            Self::Paragraph => "\n\n",
            Self::Sentence | Self::Word => " ",
        }
    }

    const fn finer(self) -> Option<Self> {
        match self {
            Self::Paragraph => Some(Self::Sentence),
            Self::Sentence => Some(Self::Word),
            Self::Word => None,
        }
    }

    fn units(self, text: &str) -> Vec<String> {
        match self {
            Self::Paragraph => PARAGRAPH_BREAK
                .split(text)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect(),
            Self::Sentence => split_sentences(text),
            Self::Word => text.split_whitespace().map(str::to_owned).collect(),
        }
    }
}

/// Splits blocks into token-bounded drafts.
///
/// ## Example
///
/// ```rust
/// use quarry::{BlockKind, ContentBlock, Splitter, TokenBudget, TokenEstimator};
///
/// let splitter = Splitter::new(TokenBudget::default());
/// let mut tokens = TokenEstimator::default();
/// let block = ContentBlock::new("p0-text-1", BlockKind::Text, 0, "The cerebral veins drain the brain.")
///     .with_ancestors(["h1"]);
///
/// let drafts = splitter
///     .split(&block, &["THE CEREBRAL VEINS".to_string()], &mut tokens)
///     .unwrap();
/// assert_eq!(drafts.len(), 1);
/// assert_eq!(drafts[0].breadcrumb_text(), "[Context: THE CEREBRAL VEINS]");
/// assert_eq!(drafts[0].page_numbers(), [1]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Splitter {
    budget: TokenBudget,
}

impl Splitter {
    /// Create a splitter working against `budget`.
    #[must_use]
    pub const fn new(budget: TokenBudget) -> Self {
        Self { budget }
    }

    /// Split `block` into one or more drafts under `breadcrumb`.
    ///
    /// Each draft carries the block id as its only source, the block's 1-based
    /// page, its section and its caption flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BreadcrumbOverBudget`] if the rendered breadcrumb
    /// leaves no room for content.
    pub fn split(
        &self,
        block: &ContentBlock,
        breadcrumb: &[String],
        tokens: &mut TokenEstimator,
    ) -> Result<Vec<ChunkDraft>> {
        let reserved = tokens.estimate(&format!("{}\n\n", format_breadcrumb(breadcrumb)));
        let available = self.budget.available_after(reserved);
        if available == 0 {
            return Err(Error::BreadcrumbOverBudget {
                block_id: block.id.clone(),
                tokens: reserved,
                budget: self.budget.soft_max(),
            });
        }

        let pieces = Self::split_text(&block.content, available, tokens);
        if pieces.len() > 1 {
            tracing::debug!(block = %block.id, pieces = pieces.len(), available, "split block");
        }

        let is_caption = block.kind == BlockKind::FigureCaption;
        Ok(pieces
            .into_iter()
            .map(|piece| {
                ChunkDraft::new(breadcrumb.to_vec(), piece, tokens)
                    .with_source_block(block.id.as_str())
                    .with_page(block.display_page())
                    .with_section(block.section_id())
                    .with_figure_caption(is_caption)
            })
            .collect())
    }

    /// Split `text` into trimmed pieces of at most `available` tokens each.
    ///
    /// Blank input yields no pieces.
    pub fn split_text(text: &str, available: usize, tokens: &mut TokenEstimator) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if tokens.estimate(text) <= available {
            return vec![text.to_owned()];
        }
        Self::pack(text, Level::Paragraph, available, tokens)
    }

    fn pack(text: &str, level: Level, available: usize, tokens: &mut TokenEstimator) -> Vec<String> {
        let separator = level.separator();
        let mut pieces = Vec::new();
        let mut current = String::new();

        for unit in level.units(text) {
            if tokens.estimate(&unit) > available {
                flush(&mut pieces, &mut current);
                match level.finer() {
                    Some(finer) => pieces.extend(Self::pack(&unit, finer, available, tokens)),
                    None => pieces.extend(force_split(&unit, available)),
                }
                continue;
            }

            if current.is_empty() {
                current = unit;
                continue;
            }

            let candidate = format!("{current}{separator}{unit}");
            if tokens.estimate(&candidate) <= available {
                current = candidate;
            } else {
                pieces.push(std::mem::replace(&mut current, unit));
            }
        }

        flush(&mut pieces, &mut current);
        pieces
    }
}

fn flush(pieces: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        pieces.push(std::mem::take(current));
    }
}

/// Cut a single oversized word on character boundaries.
fn force_split(word: &str, available: usize) -> Vec<String> {
    let max_chars = available.saturating_mul(CHARS_PER_TOKEN).max(1);
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in word.char_indices() {
        if count == max_chars {
            pieces.push(word[start..offset].to_owned());
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < word.len() {
        pieces.push(word[start..].to_owned());
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::HARD_MAX_TOKENS;
    use crate::estimate_tokens;

    fn block(content: &str) -> ContentBlock {
        ContentBlock::new("p2-text-5", BlockKind::Text, 2, content).with_ancestors(["h1", "h2"])
    }

    fn labels() -> Vec<String> {
        vec!["NEUROANATOMY".into(), "THE CEREBRAL VEINS".into()]
    }

    #[test]
    fn test_small_block_single_chunk() {
        let mut tokens = TokenEstimator::default();
        let drafts = Splitter::default()
            .split(&block("  Short text.  "), &labels(), &mut tokens)
            .unwrap();

        assert_eq!(drafts.len(), 1);
        let d = &drafts[0];
        assert_eq!(d.content(), "Short text.");
        assert_eq!(d.source_block_ids(), ["p2-text-5"]);
        assert_eq!(d.page_numbers(), [3]);
        assert!(!d.is_figure_caption());
        assert_eq!(d.overlap_tokens(), 0);
    }

    #[test]
    fn test_paragraphs_packed_greedily() {
        let mut tokens = TokenEstimator::default();
        // Each paragraph is 40 chars = 10 tokens.
        let para = "abcdefghij abcdefghij abcdefghij abcdefg";
        let text = [para; 6].join("\n\n");

        let pieces = Splitter::split_text(&text, 25, &mut tokens);
        // Two paragraphs plus separator = 82 chars = 21 tokens; three would be 31.
        assert_eq!(pieces.len(), 3);
        for piece in &pieces {
            assert_eq!(piece.matches(para).count(), 2);
        }
    }

    #[test]
    fn test_oversized_paragraph_falls_to_sentences() {
        let mut tokens = TokenEstimator::default();
        let text = "First sentence is here. Second sentence follows. Third one ends.";

        let pieces = Splitter::split_text(text, 8, &mut tokens);
        assert_eq!(
            pieces,
            vec!["First sentence is here.", "Second sentence follows.", "Third one ends."]
        );
    }

    #[test]
    fn test_long_sentence_falls_to_words() {
        let splitter = Splitter::default();
        let mut tokens = TokenEstimator::default();
        let words: Vec<String> = (0..400).map(|i| format!("word{i:02}")).collect();
        let text = words.join(" ");
        assert!(text.chars().count() > 2400);

        let drafts = splitter.split(&block(&text), &labels(), &mut tokens).unwrap();
        assert!(drafts.len() >= 2);
        for d in &drafts {
            assert!(d.token_count() <= HARD_MAX_TOKENS);
        }

        let rejoined: Vec<&str> = drafts
            .iter()
            .flat_map(|d| d.content().split_whitespace())
            .collect();
        assert_eq!(rejoined, words);
    }

    #[test]
    fn test_giant_word_force_split() {
        let splitter = Splitter::default();
        let mut tokens = TokenEstimator::default();
        let word = "x".repeat(5000);

        let drafts = splitter.split(&block(&word), &labels(), &mut tokens).unwrap();
        assert!(drafts.len() >= 3);
        assert!(drafts.iter().all(|d| d.token_count() <= HARD_MAX_TOKENS));
        let rejoined: String = drafts.iter().map(ChunkDraft::content).collect();
        assert_eq!(rejoined, word);
    }

    #[test]
    fn test_separator_counts_against_budget() {
        // "[Context: H]\n\n" is 14 chars, so a full piece lands exactly on 512.
        let mut tokens = TokenEstimator::default();
        let word = "abc".repeat(1000);
        let block = ContentBlock::new("p0-text-1", BlockKind::Text, 0, word).with_ancestors(["h"]);

        let drafts = Splitter::default().split(&block, &["H".to_owned()], &mut tokens).unwrap();
        let max = drafts.iter().map(ChunkDraft::token_count).max().unwrap();
        assert_eq!(max, 512);
    }

    #[test]
    fn test_force_split_respects_char_boundaries() {
        let pieces = force_split("日本語日本語日本語", 1);
        assert_eq!(pieces, vec!["日本語日", "本語日本", "語"]);
        assert!(pieces.iter().all(|p| estimate_tokens(p) <= 1));
    }

    #[test]
    fn test_caption_flag_from_kind() {
        let mut tokens = TokenEstimator::default();
        let caption = ContentBlock::new("p0-figure_caption-1", BlockKind::FigureCaption, 0, "Fig. 1.1 Veins.");
        let drafts = Splitter::default().split(&caption, &[], &mut tokens).unwrap();
        assert!(drafts[0].is_figure_caption());
        assert_eq!(drafts[0].breadcrumb_text(), "[Context: Document Root]");
    }

    #[test]
    fn test_breadcrumb_over_budget() {
        let budget = TokenBudget::new(1, 5, 10).unwrap();
        let mut tokens = TokenEstimator::default();
        let err = Splitter::new(budget).split(&block("text"), &labels(), &mut tokens);
        assert!(matches!(err, Err(Error::BreadcrumbOverBudget { .. })));
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        let mut tokens = TokenEstimator::default();
        assert!(Splitter::split_text(" \n\n ", 100, &mut tokens).is_empty());
    }
}
