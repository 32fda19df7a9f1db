//! Sentence boundary detection.
//!
//! A boundary is `[.!?]`, then whitespace, then an uppercase letter. Two kinds
//! of period never count:
//!
//! ```text
//! "See Fig. 4.1 for details. The next sentence."
//!         ^  ^            ^
//!         |  |            boundary
//!         |  decimal number
//!         abbreviation
//! ```
//!
//! Before scanning, the byte offset of every period inside a known
//! abbreviation or a decimal number is recorded. A candidate boundary whose
//! punctuation sits at a recorded offset is skipped. The text itself is never
//! rewritten, so sentences come back exactly as they appear in the input.
//!
//! The abbreviation list is a plain table ([`ABBREVIATIONS`]); matching is
//! case-insensitive and anchored at a word boundary, so `"data."` never matches
//! an abbreviation ending in `"a."`.

use std::sync::LazyLock;

use regex::Regex;

/// Abbreviations whose periods are never sentence boundaries.
///
/// A space inside an entry matches any run of whitespace.
pub const ABBREVIATIONS: &[&str] = &[
    "Fig.", "Figs.", "Dr.", "Mr.", "Mrs.", "Ms.", "Prof.", "Sr.", "Jr.", "St.", "et al.", "i.e.",
    "e.g.", "etc.", "vs.", "cf.", "approx.", "Vol.", "pp.", "Eq.", "Ref.", "Ch.", "Sec.", "Tab.",
];

static ABBREVIATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = ABBREVIATIONS
        .iter()
        .map(|abbr| regex::escape(abbr).replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|")))
        .expect("valid abbreviation regex")
});

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("valid decimal regex"));

static BOUNDARY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid boundary regex"));

/// Split `text` into trimmed, non-empty sentences.
///
/// Text without any boundary comes back as a single sentence.
///
/// ```rust
/// use quarry::split_sentences;
///
/// assert_eq!(
///     split_sentences("See Fig. 4.1 for details. The next sentence."),
///     vec!["See Fig. 4.1 for details.", "The next sentence."],
/// );
/// assert_eq!(split_sentences("  no punctuation here  "), vec!["no punctuation here"]);
/// assert!(split_sentences("   ").is_empty());
/// ```
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let protected = protected_periods(text);
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in BOUNDARY_PATTERN.find_iter(text) {
        if protected.binary_search(&boundary.start()).is_ok() {
            continue;
        }
        let opens_sentence = text[boundary.end()..]
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        if !opens_sentence {
            continue;
        }
        // Terminal punctuation is one ASCII byte.
        push_sentence(&mut sentences, &text[start..=boundary.start()]);
        start = boundary.end();
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

/// The last `n` sentences of `text`, in order.
#[must_use]
pub fn last_sentences(text: &str, n: usize) -> Vec<String> {
    let mut sentences = split_sentences(text);
    let skip = sentences.len().saturating_sub(n);
    sentences.drain(..skip);
    sentences
}

/// Sorted byte offsets of periods that belong to an abbreviation or a number.
fn protected_periods(text: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = ABBREVIATION_PATTERN
        .find_iter(text)
        .chain(DECIMAL_PATTERN.find_iter(text))
        .flat_map(|m| {
            m.as_str()
                .match_indices('.')
                .map(move |(offset, _)| m.start() + offset)
        })
        .collect();
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sentences() {
        let sentences = split_sentences("Hello world. How are you? I am fine!");
        assert_eq!(sentences, vec!["Hello world.", "How are you?", "I am fine!"]);
    }

    #[test]
    fn test_figure_abbreviation_and_decimal() {
        let sentences = split_sentences("See Fig. 4.1 for details. The next sentence.");
        assert_eq!(sentences, vec!["See Fig. 4.1 for details.", "The next sentence."]);
    }

    #[test]
    fn test_abbreviations_case_insensitive() {
        let sentences = split_sentences("As shown by Smith ET AL. Results vary. Done.");
        assert_eq!(sentences, vec!["As shown by Smith ET AL. Results vary.", "Done."]);
    }

    #[test]
    fn test_titles_do_not_split() {
        let sentences = split_sentences("Dr. Smith met Prof. Jones. They talked.");
        assert_eq!(sentences, vec!["Dr. Smith met Prof. Jones.", "They talked."]);
    }

    #[test]
    fn test_requires_uppercase_after_boundary() {
        let sentences = split_sentences("The value rose. then it fell. Again.");
        assert_eq!(sentences, vec!["The value rose. then it fell.", "Again."]);
    }

    #[test]
    fn test_abbreviation_needs_word_boundary() {
        // "Fig." inside "configFig." is not the abbreviation.
        let sentences = split_sentences("Load configFig. Then run.");
        assert_eq!(sentences, vec!["Load configFig.", "Then run."]);
    }

    #[test]
    fn test_no_terminal_punctuation() {
        assert_eq!(split_sentences("  a single clause  "), vec!["a single clause"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences(" \n\t ").is_empty());
    }

    #[test]
    fn test_newline_counts_as_whitespace() {
        let sentences = split_sentences("First line.\nSecond line.");
        assert_eq!(sentences, vec!["First line.", "Second line."]);
    }

    #[test]
    fn test_private_use_characters_survive() {
        let sentences = split_sentences("Glyph \u{E000} stays. Next one.");
        assert_eq!(sentences, vec!["Glyph \u{E000} stays.", "Next one."]);
    }

    #[test]
    fn test_last_sentences() {
        let text = "One. Two. Three. Four.";
        assert_eq!(last_sentences(text, 2), vec!["Three.", "Four."]);
        assert_eq!(last_sentences("Only.", 2), vec!["Only."]);
        assert!(last_sentences(text, 0).is_empty());
    }
}
