//! Document preparation.
//!
//! Each source file (and each dynamic route instance) is read, transformed,
//! titled and given its output path independently on the rayon pool. Results
//! are collected, sorted by title and checked for output path collisions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use llmstxt_markdown::{MarkdownError, ParsedMarkdown, Transform};
use rayon::prelude::*;

use crate::document::{PreparedDocument, title_order};
use crate::dynamic::{
    DynamicRouteError, DynamicRouteInstance, inject_content, process_vp_params,
    resolve_dynamic_title,
};
use crate::routes::{RouteResolver, collapse_index};
use crate::title::{UNTITLED, extract_title};

/// A document could not be prepared.
#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    /// Source file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Markdown transformation failed.
    #[error("Failed to process {path}: {source}")]
    Markdown {
        path: String,
        #[source]
        source: MarkdownError,
    },
    /// Embedded route parameter block is not valid JSON.
    #[error("Invalid route parameters in {path}: {source}")]
    Params {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// Dynamic route parameters could not be loaded.
    #[error(transparent)]
    DynamicRoute(#[from] DynamicRouteError),
    /// Another document already resolved to the same output path.
    #[error("{source_path} resolves to {path}, which is already taken")]
    DuplicatePath { path: String, source_path: String },
}

/// Prepared documents plus the per-document failures.
#[derive(Debug, Default)]
pub struct PreparedBatch {
    /// Documents in title order.
    pub documents: Vec<PreparedDocument>,
    /// Documents that could not be prepared.
    pub failures: Vec<PrepareError>,
}

/// Turns source files into [`PreparedDocument`]s.
#[derive(Clone)]
pub struct Preparer {
    resolver: RouteResolver,
    transform: Arc<dyn Transform>,
}

/// A prepared document with the source it came from.
struct Prepared {
    document: PreparedDocument,
    source: String,
}

impl Preparer {
    #[must_use]
    pub fn new(resolver: RouteResolver, transform: Arc<dyn Transform>) -> Self {
        Self {
            resolver,
            transform,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    /// Prepare one source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or transformed.
    pub fn prepare_file(&self, source: &Path) -> Result<PreparedDocument, PrepareError> {
        let parsed = self.parse_file(source)?;
        let title = extract_title(&parsed).unwrap_or_else(|| UNTITLED.to_owned());

        Ok(PreparedDocument {
            path: self.resolver.resolve_output_file_path(source),
            title,
            content: parsed.content,
            frontmatter: parsed.frontmatter,
        })
    }

    /// Read and transform one source file without resolving its route.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or transformed.
    pub fn parse_file(&self, source: &Path) -> Result<ParsedMarkdown, PrepareError> {
        let raw = read_source(source)?;
        let raw = process_vp_params(&raw).map_err(|e| PrepareError::Params {
            path: source.display().to_string(),
            source: e,
        })?;
        self.parse(&raw, source)
    }

    /// Prepare one dynamic route instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be read or transformed.
    pub fn prepare_dynamic(
        &self,
        instance: &DynamicRouteInstance,
    ) -> Result<PreparedDocument, PrepareError> {
        let template = read_source(&instance.template_route)?;
        let raw = inject_content(&template, instance.injected_content.as_deref());
        let parsed = self.parse(&raw, &instance.template_route)?;
        let title = extract_title(&parsed)
            .map_or_else(|| UNTITLED.to_owned(), |t| resolve_dynamic_title(&t, &instance.params));

        Ok(PreparedDocument {
            path: collapse_index(&self.resolver.rewrite(&instance.resolved_path)),
            title,
            content: parsed.content,
            frontmatter: parsed.frontmatter,
        })
    }

    /// Prepare all sources and route instances in parallel.
    ///
    /// Failures are logged and returned alongside the documents; they never
    /// affect other documents. When two documents resolve to the same output
    /// path, the one later in title order is reported as a failure.
    #[must_use]
    pub fn prepare_all(
        &self,
        sources: &[PathBuf],
        routes: &[DynamicRouteInstance],
    ) -> PreparedBatch {
        let files = sources.par_iter().map(|source| {
            self.prepare_file(source).map(|document| Prepared {
                document,
                source: self.resolver.relative_source(source),
            })
        });
        let dynamic = routes.par_iter().map(|instance| {
            self.prepare_dynamic(instance).map(|document| Prepared {
                document,
                source: instance.resolved_path.clone(),
            })
        });
        let results: Vec<Result<Prepared, PrepareError>> = files.chain(dynamic).collect();

        let mut prepared = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(item) => prepared.push(item),
                Err(error) => failures.push(error),
            }
        }
        prepared.sort_by(|a, b| title_order(&a.document, &b.document));

        let mut seen = HashSet::new();
        let mut documents = Vec::with_capacity(prepared.len());
        for Prepared { document, source } in prepared {
            if seen.insert(document.path.clone()) {
                documents.push(document);
            } else {
                failures.push(PrepareError::DuplicatePath {
                    path: document.path,
                    source_path: source,
                });
            }
        }

        for failure in &failures {
            tracing::warn!(error = %failure, "Skipping document");
        }
        tracing::info!(
            prepared = documents.len(),
            failed = failures.len(),
            "Prepared documents"
        );

        PreparedBatch {
            documents,
            failures,
        }
    }

    fn parse(&self, raw: &str, source: &Path) -> Result<ParsedMarkdown, PrepareError> {
        self.transform
            .transform(raw, source)
            .map_err(|e| PrepareError::Markdown {
                path: source.display().to_string(),
                source: e,
            })
    }
}

fn read_source(path: &Path) -> Result<String, PrepareError> {
    std::fs::read_to_string(path).map_err(|source| PrepareError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use llmstxt_markdown::MarkdownPipeline;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::routes::Rewrites;

    fn preparer(dir: &Path, rules: &[(&str, &str)]) -> Preparer {
        let table: BTreeMap<String, String> = rules
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Preparer::new(
            RouteResolver::new(dir, Rewrites::new(&table).unwrap()),
            Arc::new(MarkdownPipeline::new(dir)),
        )
    }

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_prepare_file() {
        let dir = TempDir::new().unwrap();
        let source = write(
            dir.path(),
            "guide/index.md",
            "---\ndescription: About the guide\n---\n# Guide\n\nBody\n",
        );

        let doc = preparer(dir.path(), &[]).prepare_file(&source).unwrap();

        assert_eq!(doc.path, "guide.md");
        assert_eq!(doc.title, "Guide");
        assert_eq!(doc.content, "# Guide\n\nBody\n");
        assert_eq!(doc.description().as_deref(), Some("About the guide"));
    }

    #[test]
    fn test_prepare_file_untitled() {
        let dir = TempDir::new().unwrap();
        let source = write(dir.path(), "notes.md", "No heading here.\n");

        let doc = preparer(dir.path(), &[]).prepare_file(&source).unwrap();

        assert_eq!(doc.title, "Untitled");
    }

    #[test]
    fn test_prepare_file_with_rewrite() {
        let dir = TempDir::new().unwrap();
        let source = write(dir.path(), "packages/core/src/index.md", "# Core\n");

        let doc = preparer(dir.path(), &[("packages/:pkg/src/index.md", ":pkg/index.md")])
            .prepare_file(&source)
            .unwrap();

        assert_eq!(doc.path, "core.md");
    }

    #[test]
    fn test_prepare_file_vp_params() {
        let dir = TempDir::new().unwrap();
        let source = write(
            dir.path(),
            "pkg.md",
            "__VP_PARAMS_START{\"pkg\":\"vitepress\"}__VP_PARAMS_END# {{ $params.pkg }}\n",
        );

        let doc = preparer(dir.path(), &[]).prepare_file(&source).unwrap();

        assert_eq!(doc.title, "vitepress");
    }

    #[test]
    fn test_prepare_dynamic() {
        let dir = TempDir::new().unwrap();
        let template = write(
            dir.path(),
            "packages/[pkg]/index.md",
            "# {{ $params.pkg }} v{{ $params.version }}\n\n<!-- @content -->\n",
        );
        let instance = DynamicRouteInstance {
            template_route: template,
            resolved_path: "packages/vitepress/index.md".to_owned(),
            params: BTreeMap::from([
                ("pkg".to_owned(), "vitepress".to_owned()),
                ("version".to_owned(), "1.0.0".to_owned()),
            ]),
            injected_content: Some("Costs $5.".to_owned()),
        };

        let doc = preparer(dir.path(), &[]).prepare_dynamic(&instance).unwrap();

        assert_eq!(doc.path, "packages/vitepress.md");
        assert_eq!(doc.title, "vitepress v1.0.0");
        assert!(doc.content.contains("Costs $5."));
    }

    #[test]
    fn test_prepare_all_sorted_with_failures() {
        let dir = TempDir::new().unwrap();
        let b = write(dir.path(), "b.md", "# Beta\n");
        let a = write(dir.path(), "a.md", "# alpha\n");
        let bad = write(dir.path(), "bad.md", "---\n[unclosed\n---\n# Bad\n");
        let missing = dir.path().join("missing.md");

        let batch = preparer(dir.path(), &[]).prepare_all(&[b, a, bad, missing], &[]);

        let titles: Vec<&str> = batch.documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "Beta"]);
        assert_eq!(batch.failures.len(), 2);
    }

    #[test]
    fn test_prepare_all_duplicate_paths() {
        let dir = TempDir::new().unwrap();
        let index = write(dir.path(), "guide/index.md", "# A Guide\n");
        let flat = write(dir.path(), "guide.md", "# B Guide\n");

        let batch = preparer(dir.path(), &[]).prepare_all(&[flat, index], &[]);

        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].title, "A Guide");
        assert!(matches!(
            &batch.failures[..],
            [PrepareError::DuplicatePath { path, source_path }]
                if path == "guide.md" && source_path == "guide.md"
        ));
    }
}
