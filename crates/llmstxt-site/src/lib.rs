//! Document preparation and `llms.txt` generation.
//!
//! This crate provides:
//! - Path normalization and route resolution (rewrites, index collapsing)
//! - [`Preparer`]: source files and dynamic routes to [`PreparedDocument`]s
//! - [`generate_toc`]: the table of contents, grouped by a [`Sidebar`]
//! - Bundle writers for `llms.txt`, `llms-full.txt` and per-page Markdown
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use llmstxt_markdown::MarkdownPipeline;
//! use llmstxt_site::{
//!     LinkStyle, LlmsTxtOptions, Preparer, Rewrites, RouteResolver, SiteMeta, SourceScanner,
//!     TocOptions, generate_llms_txt, load_index,
//! };
//!
//! let sources = SourceScanner::new("docs").scan();
//! let resolver = RouteResolver::new("docs", Rewrites::default());
//! let preparer = Preparer::new(resolver, Arc::new(MarkdownPipeline::new("docs")));
//! let batch = preparer.prepare_all(&sources.files, &[]);
//!
//! let link = LinkStyle::default();
//! let variables = BTreeMap::new();
//! let site = SiteMeta::default();
//! let options = LlmsTxtOptions {
//!     template: None,
//!     variables: &variables,
//!     site: &site,
//!     sections: &[],
//!     toc: TocOptions::new(&link),
//! };
//! let llms_txt = generate_llms_txt(&load_index(&preparer)?, &batch.documents, &options);
//! # Ok(())
//! # }
//! ```

mod bundle;
mod document;
mod dynamic;
mod paths;
mod prepare;
mod routes;
mod scanner;
mod sidebar;
mod template;
mod title;
mod toc;

pub use bundle::{
    BundleError, DEFAULT_DETAILS, DEFAULT_LLMS_TXT_TEMPLATE, GeneratedFile, LlmsTxtOptions,
    SiteMeta, WriteReport, approximate_tokens, generate_llms_full_txt, generate_llms_txt,
    human_size, index_variables, load_index, write_output, write_pages,
};
pub use document::PreparedDocument;
pub use dynamic::{
    CONTENT_MARKER, DynamicRouteError, DynamicRouteInstance, ParamValue, inject_content,
    is_route_template, load_dynamic_routes, process_vp_params, resolve_dynamic_title,
    resolve_route,
};
pub use paths::{
    directories_at_depth, is_within, join_route, normalize_for_comparison, paths_match,
    strip_extension_if_content_file, to_posix,
};
pub use prepare::{PrepareError, PreparedBatch, Preparer};
pub use routes::{RewriteError, Rewrites, RouteResolver, collapse_index, resolve_page_url};
pub use scanner::{ScanError, SourceScanner, SourceSet};
pub use sidebar::{Sidebar, SidebarError, SidebarItem, SidebarResolver, SidebarSetting};
pub use template::{
    LinkStyle, TemplateVariable, TemplateVariables, expand_template, generate_link,
};
pub use title::{DEFAULT_INDEX_TITLE, UNTITLED, extract_description, extract_title};
pub use toc::{Toc, TocOptions, generate_toc};
