//! Figure lookup and linking.
//!
//! Chunks link to figures in two ways:
//!
//! - A figure-caption block is tied to exactly one figure through its
//!   `caption_block_id`.
//! - Any other text may mention figures inline (`"see Fig. 4.1"`,
//!   `"fig.12.3"`). Mentions are matched against `figure_id`, which is the
//!   dotted figure number.
//!
//! Captions that mention other figures are scanned like any other text. No
//! reference is followed further, so linking cannot cycle.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, Result};

/// Longest caption snippet embedded in a chunk, ellipsis included.
pub const SNIPPET_MAX_CHARS: usize = 100;

const ELLIPSIS: &str = "...";

static FIGURE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Fig\.\s*(\d+\.\d+)").expect("valid figure mention regex"));

/// A known figure, as produced by upstream figure mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    /// Dotted figure number, e.g. `"4.1"`.
    pub figure_id: String,
    /// Id of the block holding this figure's caption.
    pub caption_block_id: String,
    /// Path of the extracted image.
    pub image_path: String,
    /// Full caption text.
    pub caption: String,
}

/// A denormalized, size-bounded view of a figure embedded in a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureRef {
    /// Figure number.
    pub figure_id: String,
    /// Path of the extracted image.
    pub image_path: String,
    /// Caption truncated to [`SNIPPET_MAX_CHARS`].
    pub caption_snippet: String,
}

impl From<&Figure> for FigureRef {
    fn from(figure: &Figure) -> Self {
        Self {
            figure_id: figure.figure_id.clone(),
            image_path: figure.image_path.clone(),
            caption_snippet: caption_snippet(&figure.caption),
        }
    }
}

/// Figures indexed by id and by caption block.
#[derive(Debug, Clone, Default)]
pub struct FigureIndex {
    figures: Vec<Figure>,
    by_id: HashMap<String, usize>,
    by_caption_block: HashMap<String, usize>,
}

impl FigureIndex {
    /// Index `figures`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFigure`] if two figures share an id or a
    /// caption block.
    pub fn new(figures: Vec<Figure>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(figures.len());
        let mut by_caption_block = HashMap::with_capacity(figures.len());

        for (position, figure) in figures.iter().enumerate() {
            if by_id.insert(figure.figure_id.clone(), position).is_some() {
                return Err(Error::DuplicateFigure(figure.figure_id.clone()));
            }
            if by_caption_block
                .insert(figure.caption_block_id.clone(), position)
                .is_some()
            {
                return Err(Error::DuplicateFigure(figure.caption_block_id.clone()));
            }
        }

        Ok(Self {
            figures,
            by_id,
            by_caption_block,
        })
    }

    /// Parse a JSON array of figures and index it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed input and
    /// [`Error::DuplicateFigure`] for clashing keys.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Look a figure up by id.
    #[must_use]
    pub fn get(&self, figure_id: &str) -> Option<&Figure> {
        self.by_id.get(figure_id).map(|&i| &self.figures[i])
    }

    /// Look a figure up by its caption block.
    #[must_use]
    pub fn by_caption_block(&self, block_id: &str) -> Option<&Figure> {
        self.by_caption_block.get(block_id).map(|&i| &self.figures[i])
    }

    /// Reference for the figure captioned by `block_id`.
    #[must_use]
    pub fn link_by_caption_block(&self, block_id: &str) -> Option<FigureRef> {
        self.by_caption_block(block_id).map(FigureRef::from)
    }

    /// References for every known figure mentioned in `text`.
    ///
    /// Unknown figure numbers are dropped. Each figure appears once, in order
    /// of first mention.
    ///
    /// ```rust
    /// use quarry::{Figure, FigureIndex};
    ///
    /// let figures = FigureIndex::new(vec![Figure {
    ///     figure_id: "4.1".into(),
    ///     caption_block_id: "p3-figure_caption-2".into(),
    ///     image_path: "images/fig_4_1.png".into(),
    ///     caption: "Superficial cerebral veins.".into(),
    /// }])
    /// .unwrap();
    ///
    /// let refs = figures.find_textual_references("See Fig. 4.1 and fig.4.1, not Fig. 9.9.");
    /// assert_eq!(refs.len(), 1);
    /// assert_eq!(refs[0].figure_id, "4.1");
    /// ```
    #[must_use]
    pub fn find_textual_references(&self, text: &str) -> Vec<FigureRef> {
        let mut refs: Vec<FigureRef> = Vec::new();
        for caps in FIGURE_MENTION.captures_iter(text) {
            let figure_id = &caps[1];
            if refs.iter().any(|r| r.figure_id == figure_id) {
                continue;
            }
            match self.get(figure_id) {
                Some(figure) => refs.push(FigureRef::from(figure)),
                None => tracing::debug!(figure_id, "mention of unknown figure"),
            }
        }
        refs
    }

    /// Every indexed figure, in input order.
    #[must_use]
    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    /// Number of figures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.figures.len()
    }

    /// Whether no figures are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }
}

/// Truncate a caption to at most [`SNIPPET_MAX_CHARS`] characters.
///
/// Long captions are cut at the last word boundary that leaves room for a
/// trailing `"..."`.
#[must_use]
pub fn caption_snippet(caption: &str) -> String {
    let caption = caption.trim();
    if caption.chars().count() <= SNIPPET_MAX_CHARS {
        return caption.to_owned();
    }

    let limit = SNIPPET_MAX_CHARS - ELLIPSIS.len();
    let mut end = 0;
    let mut chars = 0;
    for (offset, segment) in caption.split_word_bound_indices() {
        let len = segment.chars().count();
        if chars + len > limit {
            break;
        }
        chars += len;
        end = offset + segment.len();
    }

    let mut cut = caption[..end].trim_end();
    if cut.is_empty() {
        // A single word longer than the limit.
        cut = caption
            .char_indices()
            .nth(limit)
            .map_or(caption, |(i, _)| &caption[..i]);
    }
    format!("{cut}{ELLIPSIS}")
}
