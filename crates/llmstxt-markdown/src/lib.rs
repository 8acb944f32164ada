//! Markdown preprocessing for llmstxt.
//!
//! Turns a raw source page into `{content, frontmatter}`:
//!
//! - YAML frontmatter is split off and parsed into [`Frontmatter`]
//! - `<!-- @include: -->` markers and `<<<` snippet imports are expanded
//! - `<llm-only>` blocks are unwrapped and `<llm-exclude>` blocks removed
//! - HTML is optionally stripped
//!
//! The [`Transform`] trait is the seam the site crate consumes; the
//! [`MarkdownPipeline`] is its only production implementation.

mod fence;
mod frontmatter;
mod html;
mod include;
mod pipeline;
mod tags;

use std::path::Path;

pub use frontmatter::{Frontmatter, split_frontmatter};
pub use html::first_heading;
pub use pipeline::MarkdownPipeline;

/// Result of transforming one source page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMarkdown {
    /// Body text with frontmatter removed.
    pub content: String,
    /// Parsed frontmatter (empty when the page has none).
    pub frontmatter: Frontmatter,
}

/// Raw text to `{content, frontmatter}`.
pub trait Transform: Send + Sync {
    /// Transform `raw`, read from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the frontmatter cannot be parsed.
    fn transform(&self, raw: &str, path: &Path) -> Result<ParsedMarkdown, MarkdownError>;
}

/// Markdown processing error.
#[derive(Debug, thiserror::Error)]
pub enum MarkdownError {
    /// Frontmatter YAML is malformed.
    #[error("Invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),
    /// Frontmatter parsed but is not a key/value mapping.
    #[error("Frontmatter must be a mapping")]
    FrontmatterShape,
}
