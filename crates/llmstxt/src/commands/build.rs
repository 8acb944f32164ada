//! `llmstxt build` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use llmstxt_config::{CliSettings, Config};
use llmstxt_markdown::MarkdownPipeline;
use llmstxt_site::{
    BundleError, DynamicRouteInstance, GeneratedFile, LinkStyle, LlmsTxtOptions, Preparer,
    Rewrites, RouteResolver, Sidebar, SidebarError, SidebarItem, SidebarSetting,
    SiteMeta, SourceScanner, SourceSet, TocOptions, directories_at_depth, generate_llms_full_txt,
    generate_llms_txt, load_dynamic_routes, load_index, to_posix, write_output, write_pages,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover llmstxt.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Domain prepended to generated links (overrides config).
    #[arg(long, env = "LLMSTXT_DOMAIN")]
    domain: Option<String>,

    /// Directory depth for additional llms.txt files (overrides config).
    #[arg(long)]
    depth: Option<u32>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

/// Counts generation tasks so the run fails only if every one of them did.
#[derive(Debug, Default)]
struct TaskTally {
    attempted: usize,
    failed: usize,
}

impl TaskTally {
    fn record<T>(&mut self, output: &Output, result: Result<T, String>) -> Option<T> {
        self.attempted += 1;
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.failed += 1;
                output.error(&message);
                None
            }
        }
    }

    fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            out_dir: self.out_dir,
            domain: self.domain,
            depth: self.depth,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let source_dir = config.docs_resolved.source_dir.clone();
        let out_dir = config.docs_resolved.out_dir.clone();

        output.info(&format!("Source: {}", source_dir.display()));
        output.info(&format!("Output: {}", out_dir.display()));

        let rewrites = Rewrites::new(&config.rewrites)?;
        let sources = SourceScanner::new(&source_dir)
            .with_out_dir(&out_dir)
            .with_rewrites(rewrites.clone())
            .with_index_page(!config.llms.exclude_index_page)
            .with_ignore_patterns(&config.llms.ignore_files)?
            .scan();

        if sources.files.is_empty() && sources.templates.is_empty() {
            output.warning(
                "No markdown files found to process. Check the source_dir and ignore_files settings.",
            );
            return Ok(());
        }
        output.info(&format!(
            "Processing {} markdown files from {}",
            sources.files.len(),
            source_dir.display()
        ));

        let routes = dynamic_routes(&config, &sources, &source_dir, &output);
        let pipeline = MarkdownPipeline::new(&source_dir).with_strip_html(config.llms.strip_html);
        let preparer = Preparer::new(
            RouteResolver::new(&source_dir, rewrites),
            Arc::new(pipeline),
        );

        let batch = preparer.prepare_all(&sources.files, &routes);
        tracing::debug!(
            documents = batch.documents.len(),
            failures = batch.failures.len(),
            "Prepared documents"
        );
        for failure in &batch.failures {
            output.warning(&format!("Skipped: {failure}"));
        }

        let link = LinkStyle {
            domain: config.llms.domain.clone(),
            base: config.site.base.clone(),
            extension: if config.llms.generate_pages {
                ".md".to_owned()
            } else {
                ".html".to_owned()
            },
            clean_urls: config.llms.clean_urls,
        };
        let relative_sources: Vec<String> = sources
            .files
            .iter()
            .map(|path| to_posix(path.strip_prefix(&source_dir).unwrap_or(path)))
            .collect();
        let directories =
            directories_at_depth(relative_sources.iter().map(String::as_str), config.llms.depth);

        let mut tally = TaskTally::default();
        let documents = &batch.documents;

        if config.llms.generate_llms_txt {
            let sections = resolve_sections(&config);
            let index = load_index(&preparer);
            for directory in &directories {
                let result = match (&sections, &index) {
                    (Err(e), _) => Err(format!("Cannot generate llms.txt: {e}")),
                    (_, Err(e)) => Err(format!("Cannot generate llms.txt: {e}")),
                    (Ok(sections), Ok(index)) => {
                        let site = SiteMeta {
                            title: config.site.title.clone(),
                            description: config.site.description.clone(),
                            title_template: config.site.title_template.clone(),
                        };
                        let options = LlmsTxtOptions {
                            template: config.llms.template.as_deref(),
                            variables: &config.llms.variables,
                            site: &site,
                            sections,
                            toc: TocOptions::new(&link).with_directory_filter(directory),
                        };
                        let text = generate_llms_txt(index, documents, &options);
                        write(&out_dir, directory, "llms.txt", &text)
                    }
                };
                if let Some((name, file)) = tally.record(&output, result) {
                    output.generated(
                        &name,
                        &file,
                        &format!("with {} documentation links", documents.len()),
                    );
                }
            }
        }

        if config.llms.generate_llms_full_txt {
            for directory in &directories {
                let result = generate_llms_full_txt(documents, &link, Some(directory))
                    .map_err(|e| e.to_string())
                    .and_then(|text| write(&out_dir, directory, "llms-full.txt", &text));
                if let Some((name, file)) = tally.record(&output, result) {
                    output.generated(
                        &name,
                        &file,
                        &format!("with {} markdown files", documents.len()),
                    );
                }
            }
        }

        if config.llms.generate_pages {
            let report = write_pages(documents, &out_dir, &link);
            for failure in &report.failures {
                output.warning(&format!("Skipped page: {failure}"));
            }
            let result = if report.written.is_empty() && !report.failures.is_empty() {
                Err(format!("Failed to write all {} pages", report.failures.len()))
            } else {
                Ok(report.written.len())
            };
            if let Some(count) = tally.record(&output, result) {
                output.success(&format!("Wrote {count} Markdown pages"));
            }
        }

        output.summary(
            documents.len(),
            batch.failures.len(),
            (tally.attempted - tally.failed, tally.attempted),
        );
        if tally.all_failed() {
            return Err(CliError::AllTasksFailed(tally.attempted));
        }
        Ok(())
    }
}

/// Expand dynamic-route templates. A broken parameter file drops the whole batch.
fn dynamic_routes(
    config: &Config,
    sources: &SourceSet,
    source_dir: &Path,
    output: &Output,
) -> Vec<DynamicRouteInstance> {
    if !config.llms.dynamic_routes || sources.templates.is_empty() {
        return Vec::new();
    }
    match load_dynamic_routes(source_dir, &sources.templates) {
        Ok(routes) => {
            output.info(&format!("Processing {} dynamic routes", routes.len()));
            routes
        }
        Err(e) => {
            output.error(&format!("Failed to process dynamic routes: {e}"));
            Vec::new()
        }
    }
}

/// Sidebar sections for the TOC: the `llms.sidebar` override, else `site.sidebar`.
///
/// A site sidebar without any items is dropped so the TOC falls back to the
/// flat listing instead of putting every page under "Other".
fn resolve_sections(config: &Config) -> Result<Vec<SidebarItem>, SidebarError> {
    let load = |path: &Option<PathBuf>| path.as_deref().map(Sidebar::load).transpose();

    let setting = match load(&config.docs_resolved.llms_sidebar)? {
        Some(sidebar) => SidebarSetting::Static(Some(sidebar)),
        None => SidebarSetting::Resolver(Box::new(|default: Option<Sidebar>| {
            default.filter(|sidebar| !sidebar.is_empty())
        })),
    };
    let default = load(&config.docs_resolved.sidebar)?;
    Ok(setting
        .resolve(default)
        .map(Sidebar::into_sections)
        .unwrap_or_default())
}

/// Write a generated file under its directory and return its display name.
fn write(
    out_dir: &Path,
    directory: &str,
    file_name: &str,
    text: &str,
) -> Result<(String, GeneratedFile), String> {
    let name = if directory == "." {
        file_name.to_owned()
    } else {
        format!("{directory}/{file_name}")
    };
    write_output(out_dir, &name, text)
        .map(|file| (name, file))
        .map_err(|e: BundleError| e.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn write_file(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn args(config: PathBuf) -> BuildArgs {
        BuildArgs {
            config: Some(config),
            source_dir: None,
            out_dir: None,
            domain: None,
            depth: None,
            verbose: false,
        }
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_file(
            root,
            "llmstxt.toml",
            "[site]\ntitle = \"Example\"\nsidebar = \"sidebar.yaml\"\n\n[llms]\ndepth = 2\n",
        );
        write_file(
            root,
            "sidebar.yaml",
            "- text: Guide\n  items:\n    - text: Intro\n      link: /guide/intro\n",
        );
        write_file(root, "docs/index.md", "---\ndescription: Example docs\n---\n# Home\n");
        write_file(
            root,
            "docs/guide/intro.md",
            "---\ndescription: Start here\n---\n# Intro\n\nWelcome.\n",
        );
        write_file(root, "docs/api.md", "# API\n");
        dir
    }

    #[test]
    fn test_build_writes_bundles() {
        let dir = fixture();
        let root = dir.path();

        args(root.join("llmstxt.toml")).execute().unwrap();

        let llms_txt = fs::read_to_string(root.join("dist/llms.txt")).unwrap();
        assert_eq!(
            llms_txt,
            "# Example\n\n> Example docs\n\n## Table of Contents\n\n\
             ### Guide\n\n- [Intro](/guide/intro.md): Start here\n\n\
             ### Other\n\n- [API](/api.md)\n"
        );

        let full = fs::read_to_string(root.join("dist/llms-full.txt")).unwrap();
        assert!(full.starts_with("---\nurl: /api.md\n---\n# API\n"));
        assert!(full.contains("\n---\n\n---\nurl: /guide/intro.md\ndescription: Start here\n---\n"));

        let nested = fs::read_to_string(root.join("dist/guide/llms.txt")).unwrap();
        assert!(nested.contains("- [Intro](/guide/intro.md)"));
        assert!(!nested.contains("API"));

        assert!(root.join("dist/guide/intro.md").is_file());
        assert!(!root.join("dist/index.md").exists());
    }

    #[test]
    fn test_build_without_index_fails_only_llms_txt() {
        let dir = fixture();
        let root = dir.path();
        fs::remove_file(root.join("docs/index.md")).unwrap();

        args(root.join("llmstxt.toml")).execute().unwrap();

        assert!(!root.join("dist/llms.txt").exists());
        assert!(root.join("dist/llms-full.txt").is_file());
    }

    #[test]
    fn test_build_empty_site_sidebar_lists_flat() {
        let dir = fixture();
        let root = dir.path();
        write_file(root, "sidebar.yaml", "/guide/:\n  base: /guide/\n  items: []\n");

        args(root.join("llmstxt.toml")).execute().unwrap();

        let llms_txt = fs::read_to_string(root.join("dist/llms.txt")).unwrap();
        assert_eq!(
            llms_txt,
            "# Example\n\n> Example docs\n\n## Table of Contents\n\n\
             - [API](/api.md)\n\
             - [Intro](/guide/intro.md): Start here\n"
        );
    }

    #[test]
    fn test_build_expands_directory_templates() {
        let dir = fixture();
        let root = dir.path();
        write_file(root, "docs/packages/[pkg]/index.md", "# {{ $params.pkg }}\n");
        write_file(
            root,
            "docs/packages/[pkg]/index.paths.json",
            r#"[{"params": {"pkg": "core"}}, {"params": {"pkg": "cli"}}]"#,
        );

        args(root.join("llmstxt.toml")).execute().unwrap();

        assert!(root.join("dist/packages/core.md").is_file());
        assert!(root.join("dist/packages/cli.md").is_file());
        assert!(!root.join("dist/packages/[pkg].md").exists());
        let llms_txt = fs::read_to_string(root.join("dist/llms.txt")).unwrap();
        assert!(llms_txt.contains("- [core](/packages/core.md)\n"));
        assert!(!llms_txt.contains("[pkg]"));
    }

    #[test]
    fn test_build_all_tasks_failed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_file(
            root,
            "llmstxt.toml",
            "[llms]\ngenerate_llms_full_txt = false\ngenerate_pages = false\n",
        );
        write_file(root, "docs/guide.md", "# Guide\n");

        let result = args(root.join("llmstxt.toml")).execute();

        assert!(matches!(result, Err(CliError::AllTasksFailed(1))));
    }

    #[test]
    fn test_build_missing_config() {
        let dir = TempDir::new().unwrap();
        let result = args(dir.path().join("missing.toml")).execute();
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_tally() {
        let output = Output::new();
        let mut tally = TaskTally::default();
        assert!(!tally.all_failed());
        assert_eq!(tally.record::<()>(&output, Err("boom".to_owned())), None);
        assert!(tally.all_failed());
        assert_eq!(tally.record(&output, Ok(1)), Some(1));
        assert!(!tally.all_failed());
    }
}
