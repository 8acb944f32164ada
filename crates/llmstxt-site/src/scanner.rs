//! Source discovery by filesystem walking.
//!
//! The scanner is the single owner of the discovered file set: it walks the
//! source tree once and hands back a [`SourceSet`] that preparation consumes.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::dynamic::is_route_template;
use crate::paths::to_posix;
use crate::routes::Rewrites;

/// Directory names never descended into.
const SKIPPED_DIRS: [&str; 1] = ["node_modules"];

/// Invalid ignore pattern.
#[derive(Debug, thiserror::Error)]
#[error("Invalid ignore pattern {pattern:?}: {source}")]
pub struct ScanError {
    pattern: String,
    #[source]
    source: glob::PatternError,
}

/// Files found under the source directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    /// Regular Markdown pages, sorted.
    pub files: Vec<PathBuf>,
    /// Dynamic-route templates (`[param].md`, `[param]/index.md`), sorted.
    pub templates: Vec<PathBuf>,
}

/// Walks a source directory and collects Markdown pages.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    source_dir: PathBuf,
    out_dir: Option<PathBuf>,
    ignore: Vec<Pattern>,
    include_index: bool,
    rewrites: Rewrites,
}

impl SourceScanner {
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            out_dir: None,
            ignore: Vec::new(),
            include_index: true,
            rewrites: Rewrites::default(),
        }
    }

    /// Rewrites deciding which source file becomes the root page.
    #[must_use]
    pub fn with_rewrites(mut self, rewrites: Rewrites) -> Self {
        self.rewrites = rewrites;
        self
    }

    /// Skip the output directory when it lives inside the source tree.
    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }

    /// Whether the root page (output `index.md`) is listed.
    #[must_use]
    pub fn with_index_page(mut self, include: bool) -> Self {
        self.include_index = include;
        self
    }

    /// Drop files whose source-relative path matches any of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self, ScanError> {
        for pattern in patterns {
            let compiled = Pattern::new(pattern).map_err(|source| ScanError {
                pattern: pattern.clone(),
                source,
            })?;
            self.ignore.push(compiled);
        }
        Ok(self)
    }

    /// Scan the source directory.
    ///
    /// Returns an empty set if the directory doesn't exist.
    #[must_use]
    pub fn scan(&self) -> SourceSet {
        let mut set = SourceSet::default();
        if self.source_dir.is_dir() {
            self.scan_directory(&self.source_dir, &mut set);
        }
        set.files.sort();
        set.templates.sort();
        tracing::info!(
            files = set.files.len(),
            templates = set.templates.len(),
            dir = %self.source_dir.display(),
            "Scanned sources"
        );
        set
    }

    fn scan_directory(&self, dir: &Path, set: &mut SourceSet) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory");
                return;
            }
        };

        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

            if is_dir {
                if SKIPPED_DIRS.contains(&name.as_str()) || self.is_out_dir(&path) {
                    continue;
                }
                self.scan_directory(&path, set);
            } else if path.extension().is_some_and(|e| e == "md") {
                if self.is_ignored(&path) {
                    tracing::debug!(path = %path.display(), "Ignored by pattern");
                } else if !self.include_index && self.is_root_index(&path) {
                    tracing::debug!(path = %path.display(), "Skipping root index page");
                } else if is_route_template(Path::new(&self.relative(&path))) {
                    set.templates.push(path);
                } else {
                    set.files.push(path);
                }
            }
        }
    }

    fn is_out_dir(&self, path: &Path) -> bool {
        self.out_dir.as_deref().is_some_and(|out| out == path)
    }

    fn relative(&self, path: &Path) -> String {
        to_posix(path.strip_prefix(&self.source_dir).unwrap_or(path))
    }

    /// Whether `path` is written to the root `index.md` once rewritten.
    fn is_root_index(&self, path: &Path) -> bool {
        let relative = self.relative(path);
        self.rewrites.rewrite(&relative).unwrap_or(relative) == "index.md"
    }

    fn is_ignored(&self, path: &Path) -> bool {
        if self.is_root_index(path) {
            return false;
        }
        let relative = self.relative(path);
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::default()
        };
        self.ignore
            .iter()
            .any(|pattern| pattern.matches_with(&relative, options))
    }
}
