//! Title and description lookup.

use llmstxt_markdown::{Frontmatter, ParsedMarkdown, first_heading};

/// Title used for pages without one.
pub const UNTITLED: &str = "Untitled";

/// Title used for `llms.txt` when the root page has none.
pub const DEFAULT_INDEX_TITLE: &str = "LLMs Documentation";

/// Display title of a parsed page.
///
/// Precedence: frontmatter `title`, frontmatter `titleTemplate`, then the
/// first level-1 heading. Returns `None` when none is present; callers pick
/// the fallback.
#[must_use]
pub fn extract_title(parsed: &ParsedMarkdown) -> Option<String> {
    title_from_frontmatter(&parsed.frontmatter).or_else(|| first_heading(&parsed.content))
}

/// Frontmatter part of [`extract_title`].
fn title_from_frontmatter(frontmatter: &Frontmatter) -> Option<String> {
    non_empty(frontmatter.get_str("title")).or_else(|| {
        // `titleTemplate: false` disables the template; only strings count.
        frontmatter
            .get("titleTemplate")
            .and_then(serde_yaml::Value::as_str)
            .and_then(|s| non_empty(Some(s.to_owned())))
    })
}

/// Frontmatter `description`, when present and non-empty.
#[must_use]
pub fn extract_description(frontmatter: &Frontmatter) -> Option<String> {
    non_empty(frontmatter.get_str("description"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}
