//! The parsed document tree consumed by the pipeline.
//!
//! Extraction and normalization happen upstream; by the time a [`Document`]
//! reaches quarry it is a list of pages holding typed blocks, each with the ids
//! of its ancestor section headers:
//!
//! ```text
//! page 0
//!   p0-section_header-0  "THE CEREBRAL VEINS"        ancestors: []
//!   p0-text-1            "The cerebral veins ..."     ancestors: [p0-section_header-0]
//!   p0-figure_caption-2  "Fig. 4.1 Superficial ..."   ancestors: [p0-section_header-0]
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A section heading. Feeds breadcrumbs, never becomes a chunk.
    SectionHeader,
    /// Body text.
    Text,
    /// The caption of a figure.
    FigureCaption,
    /// A running page header.
    PageHeader,
    /// Inline mathematics rendered as text.
    InlineMath,
}

/// One typed block of extracted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Stable id encoding page, kind and ordinal.
    pub id: String,
    /// Block kind.
    pub kind: BlockKind,
    /// Ancestor section-header ids, outermost first.
    #[serde(default)]
    pub parent_hierarchy: Vec<String>,
    /// Plain-text content.
    #[serde(default)]
    pub content: String,
    /// 0-based page number.
    pub page: u32,
}

impl ContentBlock {
    /// Create a block with no ancestors.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: BlockKind, page: u32, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            parent_hierarchy: Vec::new(),
            content: content.into(),
            page,
        }
    }

    /// Set the ancestor header ids, outermost first.
    #[must_use]
    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_hierarchy = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// The nearest ancestor header id, or `""` at the document root.
    #[must_use]
    pub fn section_id(&self) -> &str {
        self.parent_hierarchy.last().map_or("", String::as_str)
    }

    /// 1-based page number as shown to readers.
    #[must_use]
    pub const fn display_page(&self) -> u32 {
        self.page.saturating_add(1)
    }

    /// Whether this block produces chunks.
    ///
    /// Section headers and blank blocks do not.
    #[must_use]
    pub fn is_chunkable(&self) -> bool {
        self.kind != BlockKind::SectionHeader && !self.content.trim().is_empty()
    }

    /// Check that the ancestor list can describe a hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHierarchy`] if an ancestor id is blank or the
    /// block lists itself as its own ancestor.
    pub fn check_hierarchy(&self) -> Result<()> {
        for ancestor in &self.parent_hierarchy {
            if ancestor.trim().is_empty() {
                return Err(Error::MalformedHierarchy {
                    block_id: self.id.clone(),
                    reason: "blank ancestor id".into(),
                });
            }
            if *ancestor == self.id {
                return Err(Error::MalformedHierarchy {
                    block_id: self.id.clone(),
                    reason: "block is its own ancestor".into(),
                });
            }
        }
        Ok(())
    }
}

/// One page of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page number.
    pub number: u32,
    /// Blocks in reading order.
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

/// A whole extracted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, used as the chunk id prefix.
    pub id: String,
    /// Pages in order.
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pages: Vec::new(),
        }
    }

    /// Append a page built from `blocks`, numbered after the last page.
    #[must_use]
    pub fn with_page(mut self, blocks: Vec<ContentBlock>) -> Self {
        let number = self
            .pages
            .last()
            .map_or(0, |page| page.number.saturating_add(1));
        self.pages.push(Page { number, blocks });
        self
    }

    /// Parse a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the input does not describe a document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Every block in page and reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.pages.iter().flat_map(|page| page.blocks.iter())
    }

    /// Blocks that produce chunks, in order.
    pub fn chunkable_blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.blocks().filter(|block| block.is_chunkable())
    }

    /// Number of blocks that produce chunks.
    #[must_use]
    pub fn chunkable_block_count(&self) -> usize {
        self.chunkable_blocks().count()
    }
}
