//! The full source-to-output Markdown transformation.

use std::path::{Path, PathBuf};

use crate::frontmatter::{Frontmatter, split_frontmatter};
use crate::html::strip_html;
use crate::include::Includer;
use crate::tags::apply_llm_tags;
use crate::{MarkdownError, ParsedMarkdown, Transform};

/// Frontmatter parsing, includes, LLM tags and optional HTML stripping.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use llmstxt_markdown::{MarkdownPipeline, Transform};
///
/// let pipeline = MarkdownPipeline::new("docs").with_strip_html(true);
/// let parsed = pipeline
///     .transform("---\ntitle: Guide\n---\n# Guide <b>new</b>\n", Path::new("docs/guide.md"))
///     .unwrap();
///
/// assert_eq!(parsed.frontmatter.get_str("title").as_deref(), Some("Guide"));
/// assert_eq!(parsed.content, "# Guide new\n");
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownPipeline {
    src_dir: PathBuf,
    strip_html: bool,
}

impl MarkdownPipeline {
    /// Create a pipeline rooted at `src_dir` (the target of `@` include paths).
    #[must_use]
    pub fn new(src_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            strip_html: false,
        }
    }

    /// Enable or disable HTML removal.
    #[must_use]
    pub fn with_strip_html(mut self, enabled: bool) -> Self {
        self.strip_html = enabled;
        self
    }
}

impl Transform for MarkdownPipeline {
    fn transform(&self, raw: &str, path: &Path) -> Result<ParsedMarkdown, MarkdownError> {
        let (yaml, body) = split_frontmatter(raw);
        let frontmatter = match yaml {
            Some(yaml) => Frontmatter::parse(yaml)?,
            None => Frontmatter::default(),
        };

        let expanded = Includer::new(&self.src_dir).expand(body, path);
        let tagged = apply_llm_tags(&expanded);
        let content = if self.strip_html {
            strip_html(&tagged)
        } else {
            tagged
        };

        Ok(ParsedMarkdown {
            content,
            frontmatter,
        })
    }
}
