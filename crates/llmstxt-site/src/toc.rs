//! Table of contents assembly.
//!
//! Without a sidebar the TOC is a flat list of every document in title order.
//! With one, each top-level section becomes a `###` block (nested sections get
//! deeper headings) listing its linked documents in sidebar order, and
//! documents the sidebar never mentions are gathered under `### Other`.
//!
//! The sidebar is first walked into a tree of [`SectionNode`]s; text is only
//! produced when that tree is rendered.

use crate::document::PreparedDocument;
use crate::paths::{is_within, join_route, paths_match};
use crate::routes::resolve_page_url;
use crate::sidebar::SidebarItem;
use crate::template::LinkStyle;

/// Heading level of top-level sidebar sections.
const TOP_LEVEL_DEPTH: usize = 3;

/// Heading of the bucket for documents missing from the sidebar.
const OTHER_HEADING: &str = "### Other";

/// Options for [`generate_toc`].
#[derive(Debug, Clone, Copy)]
pub struct TocOptions<'a> {
    /// How document links are spelled.
    pub link: &'a LinkStyle,
    /// Only list documents inside this output directory (`"."` lists all).
    pub directory_filter: Option<&'a str>,
}

impl<'a> TocOptions<'a> {
    #[must_use]
    pub fn new(link: &'a LinkStyle) -> Self {
        Self {
            link,
            directory_filter: None,
        }
    }

    #[must_use]
    pub fn with_directory_filter(mut self, directory: &'a str) -> Self {
        self.directory_filter = Some(directory);
        self
    }
}

/// Rendered table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    /// Markdown text.
    pub text: String,
    /// Sidebar links that matched no document.
    pub warnings: Vec<String>,
}

/// One sidebar section after matching, before rendering.
#[derive(Debug, Default)]
struct SectionNode {
    heading: Option<String>,
    depth: usize,
    links: Vec<String>,
    children: Vec<SectionNode>,
}

impl SectionNode {
    fn is_empty(&self) -> bool {
        self.links.is_empty() && self.children.is_empty()
    }

    fn render(&self, out: &mut String) {
        if let Some(heading) = &self.heading {
            out.push_str(&"#".repeat(self.depth));
            out.push(' ');
            out.push_str(heading);
            out.push_str("\n\n");
        }
        for link in &self.links {
            out.push_str(link);
        }
        if !self.links.is_empty() && !self.children.is_empty() {
            out.push('\n');
        }
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            child.render(out);
        }
    }
}

/// Walks the sidebar, matching links against documents.
struct Assembler<'a> {
    documents: &'a [&'a PreparedDocument],
    link: &'a LinkStyle,
    /// Every sidebar target seen, matched or not.
    referenced: Vec<String>,
    warnings: Vec<String>,
}

impl<'a> Assembler<'a> {
    fn section(&mut self, section: &SidebarItem, depth: usize, inherited_base: &str) -> SectionNode {
        let base = section.base.as_deref().unwrap_or(inherited_base);
        let mut node = SectionNode {
            heading: section.text.clone().filter(|text| !text.is_empty()),
            depth,
            ..SectionNode::default()
        };

        for item in &section.items {
            let Some(link) = &item.link else {
                continue;
            };
            let target = join_route(item.base.as_deref().unwrap_or(base), link);
            match self.find(&target) {
                Some(document) => node.links.push(toc_line(document, self.link)),
                None => {
                    tracing::warn!(link = %link, normalized = %target, "No matching document for sidebar link");
                    self.warnings.push(format!(
                        "No matching document for sidebar link {link} (normalized: {target})"
                    ));
                }
            }
            self.referenced.push(target);
        }

        for item in section.items.iter().filter(|item| !item.items.is_empty()) {
            let child_base = item.base.as_deref().unwrap_or(base);
            let child = self.section(item, depth + 1, child_base);
            if !child.is_empty() {
                node.children.push(child);
            }
        }

        if node.is_empty() {
            node.heading = None;
        }
        node
    }

    fn find(&self, target: &str) -> Option<&'a PreparedDocument> {
        self.documents
            .iter()
            .copied()
            .find(|document| paths_match(&page_route(document), target))
    }

    fn is_referenced(&self, document: &PreparedDocument) -> bool {
        let route = page_route(document);
        self.referenced
            .iter()
            .any(|target| paths_match(&route, target))
    }
}

/// Absolute extension-less route of a document (`/guide/intro`).
fn page_route(document: &PreparedDocument) -> String {
    format!("/{}", resolve_page_url(&document.path))
}

/// `- [title](link): description` line.
fn toc_line(document: &PreparedDocument, link: &LinkStyle) -> String {
    let url = link.link(&resolve_page_url(&document.path));
    match document.description() {
        Some(description) => format!("- [{}]({url}): {description}\n", document.title),
        None => format!("- [{}]({url})\n", document.title),
    }
}

/// Build the table of contents for `documents`.
///
/// `sections` is the flattened sidebar; when empty, a flat listing in the
/// documents' own order is produced. Sidebar links without a matching
/// document are skipped and reported in [`Toc::warnings`].
#[must_use]
pub fn generate_toc(
    documents: &[PreparedDocument],
    sections: &[SidebarItem],
    options: &TocOptions<'_>,
) -> Toc {
    let filtered: Vec<&PreparedDocument> = documents
        .iter()
        .filter(|document| {
            options
                .directory_filter
                .is_none_or(|directory| is_within(&document.path, directory))
        })
        .collect();

    if sections.is_empty() {
        let text = filtered
            .iter()
            .map(|document| toc_line(document, options.link))
            .collect();
        return Toc {
            text,
            warnings: Vec::new(),
        };
    }

    let mut assembler = Assembler {
        documents: &filtered,
        link: options.link,
        referenced: Vec::new(),
        warnings: Vec::new(),
    };

    let mut blocks = Vec::new();
    for section in sections.iter().filter(|section| !section.items.is_empty()) {
        if let Some(link) = &section.link {
            assembler
                .referenced
                .push(join_route(section.base.as_deref().unwrap_or(""), link));
        }
        let node = assembler.section(section, TOP_LEVEL_DEPTH, "");
        if !node.is_empty() {
            let mut block = String::new();
            node.render(&mut block);
            blocks.push(block);
        }
    }

    let mut text = String::new();
    if !blocks.is_empty() {
        text.push_str(&blocks.join("\n"));
        text.push('\n');
    }

    let unmatched: Vec<&PreparedDocument> = filtered
        .iter()
        .copied()
        .filter(|document| !assembler.is_referenced(document))
        .collect();
    if !unmatched.is_empty() {
        text.push_str(OTHER_HEADING);
        text.push_str("\n\n");
        for document in unmatched {
            text.push_str(&toc_line(document, options.link));
        }
    }

    Toc {
        text,
        warnings: assembler.warnings,
    }
}
