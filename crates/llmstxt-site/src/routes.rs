//! Source path to output path resolution.
//!
//! A rewrite table maps source-relative paths to output paths. Keys are either
//! literal paths (`old/page.md`) or patterns with one parameter segment
//! (`packages/:pkg/src/index.md`, `guide/:rest(.*)`). The output side refers
//! to the parameter by name.
//!
//! Matching: a literal key equal to the path wins. Otherwise the matching
//! pattern with the longest fixed prefix wins; ties go to the longer total
//! fixed text, then to the lexicographically smaller key.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::paths::{strip_extension_if_content_file, to_posix};

/// `:name` with an optional `(pattern)`.
static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)(\([^)]*\))?").unwrap());

/// Invalid rewrite table entry.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// Key has more than one parameter segment.
    #[error("Rewrite rule {0:?} has more than one parameter")]
    MultipleParams(String),
    /// Custom parameter pattern is not a valid regex.
    #[error("Rewrite rule {rule:?} has an invalid pattern: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
struct WildcardRule {
    from: String,
    to: String,
    param: String,
    prefix_len: usize,
    fixed_len: usize,
    forward: Regex,
    reverse: Option<Regex>,
}

impl WildcardRule {
    fn parse(from: &str, to: &str) -> Result<Option<Self>, RewriteError> {
        let mut params = PARAM_RE.captures_iter(from);
        let Some(caps) = params.next() else {
            return Ok(None);
        };
        if params.next().is_some() {
            return Err(RewriteError::MultipleParams(from.to_owned()));
        }

        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let param = caps[1].to_owned();
        let pattern = caps
            .get(2)
            .and_then(|m| m.as_str().strip_prefix('(')?.strip_suffix(')'))
            .unwrap_or("[^/]+");
        let prefix = &from[..whole.start];
        let suffix = &from[whole.end..];

        let compile = |source: &str| {
            Regex::new(source).map_err(|source| RewriteError::Pattern {
                rule: from.to_owned(),
                source,
            })
        };
        let forward = compile(&format!(
            "^{}({pattern}){}$",
            regex::escape(prefix),
            regex::escape(suffix)
        ))?;

        let reverse = match named_param(to, &param) {
            Some(range) => Some(compile(&format!(
                "^{}({pattern}){}$",
                regex::escape(&to[..range.start]),
                regex::escape(&to[range.end..])
            ))?),
            None => None,
        };

        Ok(Some(Self {
            from: from.to_owned(),
            to: to.to_owned(),
            param,
            prefix_len: prefix.len(),
            fixed_len: prefix.len() + suffix.len(),
            forward,
            reverse,
        }))
    }

    fn apply(&self, path: &str) -> Option<String> {
        let captured = self.forward.captures(path)?.get(1)?.as_str().to_owned();
        Some(substitute_param(&self.to, &self.param, &captured))
    }

    fn invert(&self, path: &str) -> Option<String> {
        let captured = self.reverse.as_ref()?.captures(path)?.get(1)?.as_str().to_owned();
        Some(substitute_param(&self.from, &self.param, &captured))
    }
}

/// Byte range of the first `:param` (with optional pattern) in `text`.
fn named_param(text: &str, param: &str) -> Option<std::ops::Range<usize>> {
    PARAM_RE
        .captures_iter(text)
        .find(|caps| &caps[1] == param)
        .and_then(|caps| caps.get(0))
        .map(|m| m.range())
}

fn substitute_param(template: &str, param: &str, value: &str) -> String {
    let pattern = format!(r":{}(?:\([^)]*\))?", regex::escape(param));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(template, NoExpand(value)).into_owned(),
        Err(_) => template.to_owned(),
    }
}

/// Parsed rewrite table.
#[derive(Debug, Clone, Default)]
pub struct Rewrites {
    literal: BTreeMap<String, String>,
    /// Sorted most specific first.
    wildcard: Vec<WildcardRule>,
}

impl Rewrites {
    /// Parse a `{source pattern: output template}` table.
    ///
    /// # Errors
    ///
    /// Returns an error if a key has several parameters or a custom pattern
    /// does not compile.
    pub fn new(table: &BTreeMap<String, String>) -> Result<Self, RewriteError> {
        let mut rewrites = Self::default();
        for (from, to) in table {
            match WildcardRule::parse(from, to)? {
                Some(rule) => rewrites.wildcard.push(rule),
                None => {
                    rewrites.literal.insert(from.clone(), to.clone());
                }
            }
        }
        rewrites.wildcard.sort_by(|a, b| {
            (Reverse(a.prefix_len), Reverse(a.fixed_len), &a.from).cmp(&(
                Reverse(b.prefix_len),
                Reverse(b.fixed_len),
                &b.from,
            ))
        });
        Ok(rewrites)
    }

    /// Output path for a source-relative path, or `None` when no rule matches.
    #[must_use]
    pub fn rewrite(&self, relative: &str) -> Option<String> {
        if let Some(to) = self.literal.get(relative) {
            return Some(to.clone());
        }
        self.wildcard.iter().find_map(|rule| rule.apply(relative))
    }

    /// Source-relative path producing `output`, or `None` when no rule does.
    #[must_use]
    pub fn invert(&self, output: &str) -> Option<String> {
        if let Some((from, _)) = self.literal.iter().find(|(_, to)| *to == output) {
            return Some(from.clone());
        }
        self.wildcard.iter().find_map(|rule| rule.invert(output))
    }
}

/// Collapse `dir/index.md` to `dir.md`. The root `index.md` is kept.
///
/// ```
/// use llmstxt_site::collapse_index;
///
/// assert_eq!(collapse_index("guide/index.md"), "guide.md");
/// assert_eq!(collapse_index("index.md"), "index.md");
/// assert_eq!(collapse_index("guide/intro.md"), "guide/intro.md");
/// ```
#[must_use]
pub fn collapse_index(path: &str) -> String {
    match path.strip_suffix("/index.md") {
        Some(dir) if !dir.is_empty() && dir != "." => format!("{dir}.md"),
        _ => path.to_owned(),
    }
}

/// Page URL for an output-relative path: no extension, no leading slash.
#[must_use]
pub fn resolve_page_url(relative_output_path: &str) -> String {
    let posix = relative_output_path.replace('\\', "/");
    strip_extension_if_content_file(posix.trim_start_matches('/')).to_owned()
}

/// Maps source files under a working directory to output paths.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    work_dir: PathBuf,
    rewrites: Rewrites,
}

impl RouteResolver {
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>, rewrites: Rewrites) -> Self {
        Self {
            work_dir: work_dir.into(),
            rewrites,
        }
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Forward-slash path of `source` relative to the working directory.
    #[must_use]
    pub fn relative_source(&self, source: &Path) -> String {
        to_posix(source.strip_prefix(&self.work_dir).unwrap_or(source))
    }

    /// Apply the rewrite table to a source-relative path.
    #[must_use]
    pub fn rewrite(&self, relative: &str) -> String {
        self.rewrites
            .rewrite(relative)
            .unwrap_or_else(|| relative.to_owned())
    }

    /// Output path of `source`, rewritten and index-collapsed.
    #[must_use]
    pub fn resolve_output_file_path(&self, source: &Path) -> String {
        collapse_index(&self.rewrite(&self.relative_source(source)))
    }

    /// Source-relative path whose output is `output`.
    ///
    /// Used to find the root page behind `index.md` when rewrites move it.
    #[must_use]
    pub fn resolve_source_file_path(&self, output: &str) -> String {
        self.rewrites
            .invert(output)
            .unwrap_or_else(|| output.to_owned())
    }
}
