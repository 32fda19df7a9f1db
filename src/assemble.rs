//! First pass: walk the document and cut every block into chunks.

use crate::breadcrumb::BreadcrumbResolver;
use crate::chunk::{finalize_sequence, Chunk, ChunkDraft};
use crate::document::{BlockKind, Document};
use crate::figure::FigureIndex;
use crate::split::Splitter;
use crate::tokens::TokenEstimator;
use crate::Result;

/// Cut `document` into a linked chunk sequence.
///
/// Blocks are visited in page and reading order. Section headers and blank
/// blocks produce nothing. Caption blocks link to their own figure; every
/// other block links to the figures its text mentions.
///
/// # Errors
///
/// Returns [`Error::MalformedHierarchy`](crate::Error::MalformedHierarchy) for
/// a block with a bad ancestor list and
/// [`Error::BreadcrumbOverBudget`](crate::Error::BreadcrumbOverBudget) when a
/// breadcrumb leaves no room for content.
pub fn assemble(
    document: &Document,
    figures: &FigureIndex,
    splitter: &Splitter,
    tokens: &mut TokenEstimator,
) -> Result<Vec<Chunk>> {
    let resolver = BreadcrumbResolver::from_document(document);
    let mut drafts: Vec<ChunkDraft> = Vec::new();

    for block in document.chunkable_blocks() {
        block.check_hierarchy()?;
        let breadcrumb = resolver.resolve(&block.parent_hierarchy);

        for mut draft in splitter.split(block, &breadcrumb, tokens)? {
            if block.kind == BlockKind::FigureCaption {
                match figures.link_by_caption_block(&block.id) {
                    Some(figure) => draft.add_figure_references([figure]),
                    None => tracing::debug!(block = %block.id, "caption block with no known figure"),
                }
            } else {
                draft.add_figure_references(figures.find_textual_references(draft.content()));
            }
            drafts.push(draft);
        }
    }

    tracing::info!(
        document = %document.id,
        headers = resolver.len(),
        chunks = drafts.len(),
        "assembled chunks"
    );
    Ok(finalize_sequence(drafts, &document.id))
}
