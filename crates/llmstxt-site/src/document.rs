//! Prepared documents.

use std::cmp::Ordering;

use llmstxt_markdown::Frontmatter;

use crate::title::extract_description;

/// One output page after route resolution and title extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    /// Output-relative path ending in `.md` (e.g. `guide/intro.md`).
    pub path: String,
    /// Display title, never empty.
    pub title: String,
    /// Transformed body text.
    pub content: String,
    /// Frontmatter of the transformed page.
    pub frontmatter: Frontmatter,
}

impl PreparedDocument {
    /// Frontmatter `description`, if set.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        extract_description(&self.frontmatter)
    }
}

/// Title order, case-insensitive, with path as a tie-breaker.
pub(crate) fn title_order(a: &PreparedDocument, b: &PreparedDocument) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.path.cmp(&b.path))
}
