//! Bundle writers: `llms.txt`, `llms-full.txt` and the per-page mirror.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use llmstxt_markdown::{Frontmatter, MarkdownError, ParsedMarkdown};
use rayon::prelude::*;

use crate::document::PreparedDocument;
use crate::paths::is_within;
use crate::prepare::{PrepareError, Preparer};
use crate::routes::resolve_page_url;
use crate::sidebar::SidebarItem;
use crate::template::{LinkStyle, TemplateVariables, expand_template};
use crate::title::{DEFAULT_INDEX_TITLE, extract_description, extract_title};
use crate::toc::{TocOptions, generate_toc};

/// Template used when none is configured.
pub const DEFAULT_LLMS_TXT_TEMPLATE: &str =
    "# {title}\n\n> {description}\n\n{details}\n\n## Table of Contents\n\n{toc}";

/// `details` used when the site has no description.
pub const DEFAULT_DETAILS: &str = "This file contains links to all documentation sections.";

/// Separator between documents in `llms-full.txt`.
const FULL_TEXT_SEPARATOR: &str = "\n---\n\n";

/// A bundle could not be produced or written.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Root `index.md` does not exist.
    #[error("Index page not found: {path}")]
    MissingIndex { path: String },
    /// Output could not be written.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Root page could not be prepared.
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    /// Page metadata could not be serialized.
    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

/// Site-level values used as `llms.txt` fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub title_template: Option<String>,
}

/// Inputs of [`generate_llms_txt`] besides the documents.
#[derive(Debug, Clone, Copy)]
pub struct LlmsTxtOptions<'a> {
    /// Custom template; [`DEFAULT_LLMS_TXT_TEMPLATE`] when `None`.
    pub template: Option<&'a str>,
    /// Custom variables. They win over computed values.
    pub variables: &'a BTreeMap<String, String>,
    pub site: &'a SiteMeta,
    /// Flattened sidebar.
    pub sections: &'a [SidebarItem],
    pub toc: TocOptions<'a>,
}

/// Load the root page that supplies the `llms.txt` title and description.
///
/// The page is looked up through the rewrite table, so a root moved by a
/// rewrite is still found.
///
/// # Errors
///
/// Returns [`BundleError::MissingIndex`] if the page does not exist, or the
/// preparation error if it cannot be parsed.
pub fn load_index(preparer: &Preparer) -> Result<ParsedMarkdown, BundleError> {
    let resolver = preparer.resolver();
    let path = resolver
        .work_dir()
        .join(resolver.resolve_source_file_path("index.md"));
    if !path.is_file() {
        return Err(BundleError::MissingIndex {
            path: path.display().to_string(),
        });
    }
    Ok(preparer.parse_file(&path)?)
}

/// Variables for `llms.txt`, except `toc`.
///
/// Custom variables come first; computed values only fill names that have no
/// value yet.
#[must_use]
pub fn index_variables(
    index: &ParsedMarkdown,
    site: &SiteMeta,
    custom: &BTreeMap<String, String>,
) -> TemplateVariables {
    let frontmatter = &index.frontmatter;
    let mut variables: TemplateVariables = custom.iter().collect();

    variables.fill_with("title", || {
        first_of([
            frontmatter.get_path(&["hero", "name"]),
            frontmatter.get_str("title"),
            site.title.clone(),
            site.title_template.clone(),
            extract_title(index),
        ])
        .or_else(|| Some(DEFAULT_INDEX_TITLE.to_owned()))
    });
    variables.fill_with("description", || {
        first_of([
            frontmatter.get_path(&["hero", "text"]),
            site.description.clone(),
            extract_description(frontmatter),
            frontmatter.get_str("titleTemplate"),
        ])
    });
    let has_description = variables.get("description").is_some();
    variables.fill_with("details", || {
        first_of([
            frontmatter.get_path(&["hero", "tagline"]),
            frontmatter.get_str("tagline"),
        ])
    });
    if !has_description {
        variables.set_fallback("details", DEFAULT_DETAILS);
    }
    variables
}

fn first_of<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_owned())
        .find(|s| !s.is_empty())
}

/// Render `llms.txt`.
#[must_use]
pub fn generate_llms_txt(
    index: &ParsedMarkdown,
    documents: &[PreparedDocument],
    options: &LlmsTxtOptions<'_>,
) -> String {
    let mut variables = index_variables(index, options.site, options.variables);
    variables.fill_with("toc", || {
        Some(generate_toc(documents, options.sections, &options.toc).text)
    });
    expand_template(
        options.template.unwrap_or(DEFAULT_LLMS_TXT_TEMPLATE),
        &variables,
    )
}

/// Metadata block written above a document in bundles.
fn page_metadata(document: &PreparedDocument, link: &LinkStyle) -> Frontmatter {
    let mut metadata = Frontmatter::new();
    metadata.insert("url", link.link(&resolve_page_url(&document.path)));
    if let Some(description) = document.description() {
        metadata.insert("description", description);
    }
    metadata
}

/// Render `llms-full.txt`: every document with its metadata block.
///
/// # Errors
///
/// Returns an error if a metadata block cannot be serialized.
pub fn generate_llms_full_txt(
    documents: &[PreparedDocument],
    link: &LinkStyle,
    directory_filter: Option<&str>,
) -> Result<String, BundleError> {
    let entries = documents
        .iter()
        .filter(|document| directory_filter.is_none_or(|dir| is_within(&document.path, dir)))
        .map(|document| page_metadata(document, link).stringify(&document.content))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries.join(FULL_TEXT_SEPARATOR))
}

/// A file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    /// Size in bytes.
    pub bytes: usize,
    /// Approximate token count.
    pub tokens: usize,
}

impl GeneratedFile {
    /// Human-readable size, e.g. `12.3 kB`.
    #[must_use]
    pub fn size(&self) -> String {
        human_size(self.bytes)
    }
}

/// Per-page write results.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Pages written.
    pub written: Vec<GeneratedFile>,
    /// Pages that could not be written.
    pub failures: Vec<BundleError>,
}

/// Write `text` to `out_dir/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_output(out_dir: &Path, relative: &str, text: &str) -> Result<GeneratedFile, BundleError> {
    let path = out_dir.join(relative);
    let io_error = |source| BundleError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(&path, text).map_err(io_error)?;
    Ok(GeneratedFile {
        bytes: text.len(),
        tokens: approximate_tokens(text),
        path,
    })
}

/// Write every document to `out_dir/<path>` in parallel.
///
/// A failing page is logged and reported without affecting the others.
#[must_use]
pub fn write_pages(documents: &[PreparedDocument], out_dir: &Path, link: &LinkStyle) -> WriteReport {
    let results: Vec<Result<GeneratedFile, BundleError>> = documents
        .par_iter()
        .map(|document| {
            let text = page_metadata(document, link).stringify(&document.content)?;
            write_output(out_dir, &document.path, &text)
        })
        .collect();

    let mut report = WriteReport::default();
    for result in results {
        match result {
            Ok(file) => report.written.push(file),
            Err(error) => {
                tracing::warn!(error = %error, "Failed to write page");
                report.failures.push(error);
            }
        }
    }
    report
}

/// Roughly four characters per token.
#[must_use]
pub fn approximate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Format a byte count with decimal units (`B`, `kB`, `MB`, `GB`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["kB", "MB", "GB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for candidate in UNITS {
        value /= 1000.0;
        unit = candidate;
        if value < 1000.0 {
            break;
        }
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use llmstxt_markdown::MarkdownPipeline;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::routes::{Rewrites, RouteResolver};

    fn doc(title: &str, path: &str, description: Option<&str>, content: &str) -> PreparedDocument {
        let mut frontmatter = Frontmatter::new();
        if let Some(description) = description {
            frontmatter.insert("description", description);
        }
        PreparedDocument {
            path: path.to_owned(),
            title: title.to_owned(),
            content: content.to_owned(),
            frontmatter,
        }
    }

    fn index(yaml: &str, content: &str) -> ParsedMarkdown {
        ParsedMarkdown {
            content: content.to_owned(),
            frontmatter: Frontmatter::parse(yaml).unwrap(),
        }
    }

    fn render(index: &ParsedMarkdown, docs: &[PreparedDocument], site: &SiteMeta) -> String {
        let style = LinkStyle::default();
        let custom = BTreeMap::new();
        let options = LlmsTxtOptions {
            template: None,
            variables: &custom,
            site,
            sections: &[],
            toc: TocOptions::new(&style),
        };
        generate_llms_txt(index, docs, &options)
    }

    #[test]
    fn test_llms_txt_default_template() {
        let docs = vec![doc("Intro", "guide/intro.md", Some("Start here"), "")];
        let text = render(
            &index("title: My Docs\ndescription: All about it", "# Heading\n"),
            &docs,
            &SiteMeta::default(),
        );
        assert_eq!(
            text,
            "# My Docs\n\n> All about it\n\n## Table of Contents\n\n- [Intro](/guide/intro.md): Start here\n"
        );
    }

    #[test]
    fn test_llms_txt_fallbacks() {
        let text = render(&index("", "No heading\n"), &[], &SiteMeta::default());
        assert_eq!(
            text,
            "# LLMs Documentation\n\n> \n\nThis file contains links to all documentation sections.\n\n## Table of Contents"
        );
    }

    #[test]
    fn test_llms_txt_hero_wins() {
        let yaml = "title: Page\nhero:\n  name: Hero Name\n  text: Hero text\n  tagline: Hero tagline";
        let site = SiteMeta {
            title: Some("Site".to_owned()),
            description: Some("Site description".to_owned()),
            title_template: None,
        };
        let text = render(&index(yaml, ""), &[], &site);
        assert!(text.starts_with("# Hero Name\n\n> Hero text\n\nHero tagline\n\n"));
    }

    #[test]
    fn test_index_variables_precedence() {
        let site = SiteMeta {
            title: Some("Site".to_owned()),
            description: Some("Site description".to_owned()),
            title_template: Some("Template".to_owned()),
        };
        let vars = index_variables(&index("description: Page description", "# Heading\n"), &site, &BTreeMap::new());
        assert_eq!(vars.get("title"), Some("Site"));
        assert_eq!(vars.get("description"), Some("Site description"));
        assert_eq!(vars.get("details"), None);

        let vars = index_variables(&index("", "# Heading\n"), &SiteMeta::default(), &BTreeMap::new());
        assert_eq!(vars.get("title"), Some("Heading"));
    }

    #[test]
    fn test_index_title_prefers_site_title_over_title_template() {
        let site = SiteMeta {
            title: Some("Site".to_owned()),
            ..SiteMeta::default()
        };
        let vars = index_variables(&index("titleTemplate: Tpl", "# Heading\n"), &site, &BTreeMap::new());
        assert_eq!(vars.get("title"), Some("Site"));

        let vars = index_variables(
            &index("titleTemplate: Tpl", "# Heading\n"),
            &SiteMeta::default(),
            &BTreeMap::new(),
        );
        assert_eq!(vars.get("title"), Some("Tpl"));
    }

    #[test]
    fn test_custom_variables_win() {
        let custom = BTreeMap::from([
            ("title".to_owned(), "Custom".to_owned()),
            ("toc".to_owned(), "custom toc".to_owned()),
            ("version".to_owned(), "2.0".to_owned()),
        ]);
        let style = LinkStyle::default();
        let site = SiteMeta::default();
        let options = LlmsTxtOptions {
            template: Some("{title} {version}\n\n{toc}"),
            variables: &custom,
            site: &site,
            sections: &[],
            toc: TocOptions::new(&style),
        };
        let docs = vec![doc("A", "a.md", None, "")];
        let text = generate_llms_txt(&index("title: Page", ""), &docs, &options);
        assert_eq!(text, "Custom 2.0\n\ncustom toc");
    }

    #[test]
    fn test_llms_full_txt() {
        let docs = vec![
            doc("A", "a.md", Some("About A"), "# A\n\nBody A\n"),
            doc("B", "guide/b.md", None, "# B\n"),
        ];
        let style = LinkStyle {
            domain: Some("https://example.com".to_owned()),
            ..LinkStyle::default()
        };
        let text = generate_llms_full_txt(&docs, &style, None).unwrap();
        assert_eq!(
            text,
            "---\nurl: https://example.com/a.md\ndescription: About A\n---\n# A\n\nBody A\n\
             \n---\n\n\
             ---\nurl: https://example.com/guide/b.md\n---\n# B\n"
        );
    }

    #[test]
    fn test_llms_full_txt_directory_filter() {
        let docs = vec![
            doc("A", "a.md", None, "A\n"),
            doc("B", "guide/b.md", None, "B\n"),
        ];
        let text = generate_llms_full_txt(&docs, &LinkStyle::default(), Some("guide")).unwrap();
        assert_eq!(text, "---\nurl: /guide/b.md\n---\nB\n");
    }

    #[test]
    fn test_write_pages() {
        let dir = TempDir::new().unwrap();
        let docs = vec![
            doc("A", "a.md", None, "A\n"),
            doc("B", "nested/deep/b.md", Some("About B"), "B\n"),
        ];

        let report = write_pages(&docs, dir.path(), &LinkStyle::default());

        assert_eq!(report.written.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("nested/deep/b.md")).unwrap(),
            "---\nurl: /nested/deep/b.md\ndescription: About B\n---\nB\n"
        );
    }

    #[test]
    fn test_write_pages_isolates_failures() {
        let dir = TempDir::new().unwrap();
        // A file where a directory is needed.
        fs::write(dir.path().join("blocked"), "").unwrap();
        let docs = vec![
            doc("A", "a.md", None, "A\n"),
            doc("B", "blocked/b.md", None, "B\n"),
        ];

        let report = write_pages(&docs, dir.path(), &LinkStyle::default());

        assert_eq!(report.written.len(), 1);
        assert!(matches!(&report.failures[..], [BundleError::Io { .. }]));
        assert!(dir.path().join("a.md").is_file());
    }

    #[test]
    fn test_write_output_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_output(dir.path(), "guide/llms.txt", "one").unwrap();
        let file = write_output(dir.path(), "guide/llms.txt", "two!").unwrap();
        assert_eq!(file.bytes, 4);
        assert_eq!(file.tokens, 1);
        assert_eq!(fs::read_to_string(dir.path().join("guide/llms.txt")).unwrap(), "two!");
    }

    #[test]
    fn test_load_index_missing() {
        let dir = TempDir::new().unwrap();
        let preparer = Preparer::new(
            RouteResolver::new(dir.path(), Rewrites::default()),
            Arc::new(MarkdownPipeline::new(dir.path())),
        );
        assert!(matches!(
            load_index(&preparer),
            Err(BundleError::MissingIndex { .. })
        ));
    }

    #[test]
    fn test_load_index_through_rewrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("home.md"), "---\ntitle: Home\n---\n# Welcome\n").unwrap();
        let table = BTreeMap::from([("home.md".to_owned(), "index.md".to_owned())]);
        let preparer = Preparer::new(
            RouteResolver::new(dir.path(), Rewrites::new(&table).unwrap()),
            Arc::new(MarkdownPipeline::new(dir.path())),
        );
        let parsed = load_index(&preparer).unwrap();
        assert_eq!(parsed.frontmatter.get_str("title").as_deref(), Some("Home"));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1500), "1.5 kB");
        assert_eq!(human_size(2_500_000), "2.5 MB");
    }

    #[test]
    fn test_approximate_tokens() {
        assert_eq!(approximate_tokens(""), 0);
        assert_eq!(approximate_tokens("abcdefgh"), 2);
        assert_eq!(approximate_tokens("abcdefghi"), 3);
    }
}
