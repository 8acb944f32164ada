//! File inclusion: `<!-- @include: ... -->` markers and `<<<` snippet imports.
//!
//! Include syntax: `<!-- @include: path[#region][{start,end}] -->`. Paths that
//! start with `@` resolve against the source root, all others against the
//! including file's directory. Included Markdown files lose their frontmatter
//! and are expanded recursively.
//!
//! Snippet syntax: a line `<<< path[#region][{meta}]` becomes a fenced code
//! block tagged with the file extension.
//!
//! Missing files are logged and the marker is left in place.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::fence::FenceTracker;
use crate::frontmatter::split_frontmatter;

/// Nesting limit for recursive includes.
const MAX_INCLUDE_DEPTH: usize = 16;

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*@include:\s*(.*?)\s*-->").unwrap());

static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*<<<\s*(\S.*?)\s*$").unwrap());

/// `path#region{start,end}`; region and range are optional.
static INCLUDE_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>[^#{]+?)(?:#(?P<region>[^{]+?))?(?:\{(?P<start>\d*)(?P<comma>,)?(?P<end>\d*)\})?$")
        .unwrap()
});

/// `path#region{meta} [title]`; everything after the path is optional.
static SNIPPET_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>[^#{\s]+)(?:#(?P<region>[^{\s]+))?(?:\{(?P<meta>[^}]*)\})?(?:\s+\[(?P<title>[^\]]*)\])?$")
        .unwrap()
});

/// Any region marker line, used to drop nested markers from extracted text.
static ANY_REGION_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:<!--|//|/\*)?\s*#\s?(?:end)?region\b").unwrap());

/// `#endregion` without a name closes the innermost open region.
static NAMELESS_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:<!--|//|/\*)?\s*#\s?endregion\s*(?:-->|\*/)?\s*$").unwrap()
});

/// Expands includes and snippets relative to a source root.
pub(crate) struct Includer<'a> {
    src_dir: &'a Path,
}

impl<'a> Includer<'a> {
    pub(crate) fn new(src_dir: &'a Path) -> Self {
        Self { src_dir }
    }

    /// Expand every include marker and snippet line in `content`.
    ///
    /// `file` is the path of the document `content` came from.
    pub(crate) fn expand(&self, content: &str, file: &Path) -> String {
        let mut stack = vec![file.to_path_buf()];
        self.expand_nested(content, file, &mut stack)
    }

    fn expand_nested(&self, content: &str, file: &Path, stack: &mut Vec<PathBuf>) -> String {
        let base_dir = file.parent().unwrap_or(self.src_dir);
        let mut fences = FenceTracker::new();
        let mut out = String::with_capacity(content.len());

        for line in content.split_inclusive('\n') {
            if fences.update(line) || fences.in_fence() {
                out.push_str(line);
                continue;
            }

            let (body, newline) = split_line_ending(line);

            if let Some(caps) = SNIPPET_RE.captures(body) {
                match self.snippet_block(&caps[1], base_dir) {
                    Some(block) => {
                        out.push_str(&block);
                        out.push_str(newline);
                    }
                    None => out.push_str(line),
                }
                continue;
            }

            if INCLUDE_RE.is_match(body) {
                let expanded = INCLUDE_RE.replace_all(body, |caps: &Captures| {
                    self.include(&caps[1], base_dir, stack)
                        .unwrap_or_else(|| caps[0].to_owned())
                });
                out.push_str(&expanded);
                out.push_str(newline);
                continue;
            }

            out.push_str(line);
        }

        out
    }

    /// Resolve one include target. `None` keeps the marker.
    fn include(&self, target: &str, base_dir: &Path, stack: &mut Vec<PathBuf>) -> Option<String> {
        let Some(caps) = INCLUDE_TARGET_RE.captures(target.trim()) else {
            tracing::warn!(target, "Malformed include marker");
            return None;
        };
        let path = self.resolve(caps["path"].trim(), base_dir);

        if stack.len() >= MAX_INCLUDE_DEPTH || stack.contains(&path) {
            tracing::warn!(path = %path.display(), "Include cycle detected, skipping");
            return None;
        }

        let raw = std::fs::read_to_string(&path)
            .inspect_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Included file not found");
            })
            .ok()?;

        let mut text = if is_markdown(&path) {
            split_frontmatter(&raw).1.to_owned()
        } else {
            raw
        };

        if let Some(region) = caps.name("region") {
            text = select_region(&text, region.as_str().trim(), &path);
        }

        if let Some(start) = caps.name("start") {
            let start = parse_line_number(start.as_str());
            let end = match (caps.name("comma"), caps.name("end")) {
                (None, _) => start,
                (Some(_), end) => end.and_then(|m| parse_line_number(m.as_str())),
            };
            text = select_lines(&text, start, end);
        }

        if is_markdown(&path) {
            stack.push(path.clone());
            text = self.expand_nested(&text, &path, stack);
            stack.pop();
        }

        Some(text.trim_end_matches('\n').to_owned())
    }

    /// Render a `<<<` import as a fenced code block. `None` keeps the line.
    fn snippet_block(&self, target: &str, base_dir: &Path) -> Option<String> {
        let Some(caps) = SNIPPET_TARGET_RE.captures(target) else {
            tracing::warn!(target, "Malformed snippet import");
            return None;
        };
        let path = self.resolve(&caps["path"], base_dir);

        let code = std::fs::read_to_string(&path)
            .inspect_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Snippet file not found");
            })
            .ok()?;

        let code = match caps.name("region") {
            Some(region) => select_region(&code, region.as_str(), &path),
            None => code,
        };

        let lang = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut block = format!("```{lang}");
        if let Some(meta) = caps.name("meta").filter(|m| !m.as_str().is_empty()) {
            let _ = write!(block, " {{{}}}", meta.as_str());
        }
        if let Some(title) = caps.name("title").filter(|m| !m.as_str().is_empty()) {
            let _ = write!(block, " [{}]", title.as_str());
        }
        block.push('\n');
        block.push_str(code.trim_end_matches('\n'));
        block.push_str("\n```");
        Some(block)
    }

    fn resolve(&self, raw: &str, base_dir: &Path) -> PathBuf {
        match raw.strip_prefix('@') {
            Some(rest) => self.src_dir.join(rest.trim_start_matches('/')),
            None => base_dir.join(raw),
        }
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    let body = line.trim_end_matches(['\r', '\n']);
    (body, &line[body.len()..])
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

fn parse_line_number(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|n| *n > 0)
}

/// Lines `start..=end` (1-based). Open bounds extend to the file edges.
fn select_lines(text: &str, start: Option<usize>, end: Option<usize>) -> String {
    let skip = start.map_or(0, |s| s - 1);
    let take = end.map_or(usize::MAX, |e| e.saturating_sub(skip));
    text.lines()
        .skip(skip)
        .take(take)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text between `#region name` and `#endregion` markers.
///
/// Falls back to the whole text, with a warning, when the region is absent.
fn select_region(text: &str, name: &str, path: &Path) -> String {
    let escaped = regex::escape(name);
    let marker = |keyword: &str| {
        Regex::new(&format!(
            r"^\s*(?:<!--|//|/\*)?\s*#\s?{keyword}\s+{escaped}(?:\s|-->|\*/|$)"
        ))
    };
    let (Ok(start_re), Ok(end_re)) = (marker("region"), marker("endregion")) else {
        return text.to_owned();
    };

    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| start_re.is_match(l)) else {
        tracing::warn!(path = %path.display(), region = name, "Region not found, including whole file");
        return text.to_owned();
    };

    let end = lines[start + 1..]
        .iter()
        .position(|l| end_re.is_match(l) || NAMELESS_END_RE.is_match(l))
        .map_or(lines.len(), |offset| start + 1 + offset);

    lines[start + 1..end]
        .iter()
        .filter(|l| !ANY_REGION_MARKER_RE.is_match(l))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}
