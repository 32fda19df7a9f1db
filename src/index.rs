//! Lookup tables over a finished chunk sequence.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::{Error, Result};

/// Section, page and figure lookups for a chunk sequence.
///
/// Page keys are strings so the index serializes as plain JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkIndex {
    /// Number of chunks indexed.
    pub total_chunks: usize,
    /// Section id to chunk ids, in sequence order.
    pub by_section: BTreeMap<String, Vec<String>>,
    /// 1-based page number to chunk ids.
    pub by_page: BTreeMap<String, Vec<String>>,
    /// Figure id to the chunks that are or mention it.
    pub by_figure: BTreeMap<String, Vec<String>>,
}

impl ChunkIndex {
    /// Index `chunks`.
    #[must_use]
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut index = Self {
            total_chunks: chunks.len(),
            ..Self::default()
        };

        for chunk in chunks {
            index
                .by_section
                .entry(chunk.parent_section_id.clone())
                .or_default()
                .push(chunk.chunk_id.clone());
            for page in &chunk.page_numbers {
                index
                    .by_page
                    .entry(page.to_string())
                    .or_default()
                    .push(chunk.chunk_id.clone());
            }
            for figure in &chunk.figure_references {
                index
                    .by_figure
                    .entry(figure.figure_id.clone())
                    .or_default()
                    .push(chunk.chunk_id.clone());
            }
        }

        index
    }

    /// Check that this index describes `chunks`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexMismatch`] if `total_chunks` differs from the
    /// sequence length or any entry names an unknown chunk.
    pub fn verify(&self, chunks: &[Chunk]) -> Result<()> {
        if self.total_chunks != chunks.len() {
            return Err(Error::IndexMismatch(format!(
                "total_chunks is {}, sequence has {}",
                self.total_chunks,
                chunks.len()
            )));
        }

        let known: HashSet<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        let tables = [
            ("section", &self.by_section),
            ("page", &self.by_page),
            ("figure", &self.by_figure),
        ];
        for (table, map) in tables {
            for (key, ids) in map {
                if let Some(unknown) = ids.iter().find(|id| !known.contains(id.as_str())) {
                    return Err(Error::IndexMismatch(format!(
                        "{table} {key:?} references unknown chunk {unknown}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Chunk ids in `section_id`.
    #[must_use]
    pub fn section(&self, section_id: &str) -> &[String] {
        self.by_section.get(section_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chunk ids on 1-based `page`.
    #[must_use]
    pub fn page(&self, page: u32) -> &[String] {
        self.by_page.get(&page.to_string()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chunk ids linked to `figure_id`.
    #[must_use]
    pub fn figure(&self, figure_id: &str) -> &[String] {
        self.by_figure.get(figure_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
