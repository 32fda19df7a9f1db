//! Breadcrumbs: the chain of section headers above a block.
//!
//! ```text
//! ancestors: [p0-section_header-0, p1-section_header-4]
//! labels:    ["NEUROANATOMY", "THE CEREBRAL VEINS"]
//! text:      "[Context: NEUROANATOMY > THE CEREBRAL VEINS]"
//! ```

use std::collections::HashMap;

use crate::document::{BlockKind, Document};

/// Label used when a block has no resolvable ancestors.
pub const DOCUMENT_ROOT: &str = "Document Root";

/// Maps section-header block ids to their text.
#[derive(Debug, Clone, Default)]
pub struct BreadcrumbResolver {
    headers: HashMap<String, String>,
}

impl BreadcrumbResolver {
    /// Collect every section header in `document`.
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        let headers = document
            .blocks()
            .filter(|block| block.kind == BlockKind::SectionHeader)
            .map(|block| (block.id.clone(), block.content.trim().to_owned()))
            .collect();
        Self { headers }
    }

    /// Resolve ancestor ids to labels, skipping ids with no known header.
    #[must_use]
    pub fn resolve(&self, ancestors: &[String]) -> Vec<String> {
        ancestors
            .iter()
            .filter_map(|id| {
                let label = self.headers.get(id);
                if label.is_none() {
                    tracing::debug!(ancestor = %id, "unresolved breadcrumb ancestor");
                }
                label.cloned()
            })
            .collect()
    }

    /// Number of known headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether no headers are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Format labels as `"[Context: A > B]"`.
///
/// ```rust
/// use quarry::format_breadcrumb;
///
/// assert_eq!(format_breadcrumb(&["A".into(), "B".into()]), "[Context: A > B]");
/// assert_eq!(format_breadcrumb(&[]), "[Context: Document Root]");
/// ```
#[must_use]
pub fn format_breadcrumb(labels: &[String]) -> String {
    if labels.is_empty() {
        format!("[Context: {DOCUMENT_ROOT}]")
    } else {
        format!("[Context: {}]", labels.join(" > "))
    }
}
