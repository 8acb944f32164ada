//! Path normalization.
//!
//! Source files, output paths and sidebar links spell the same page in
//! several ways (`guide/index.md`, `/guide/`, `/guide`). Everything here works
//! on forward-slash strings so results are identical on every platform.

use std::collections::BTreeSet;
use std::path::Path;

/// Extensions that identify a page rather than an arbitrary file.
const CONTENT_EXTENSIONS: [&str; 2] = [".md", ".html"];

/// Render a filesystem path with forward slashes.
#[must_use]
pub fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Remove a trailing `.md` / `.html` extension.
///
/// Other extensions are left alone, and so is a bare `.md` segment with no
/// file stem. Stacked content extensions (`a.md.md`) are all removed so the
/// operation is idempotent.
///
/// ```
/// use llmstxt_site::strip_extension_if_content_file;
///
/// assert_eq!(strip_extension_if_content_file("guide/intro.md"), "guide/intro");
/// assert_eq!(strip_extension_if_content_file("page.html"), "page");
/// assert_eq!(strip_extension_if_content_file("logo.svg"), "logo.svg");
/// ```
#[must_use]
pub fn strip_extension_if_content_file(path: &str) -> &str {
    let mut current = path;
    loop {
        let stripped = CONTENT_EXTENSIONS
            .iter()
            .find_map(|ext| current.strip_suffix(ext))
            .filter(|stem| !stem.is_empty() && !stem.ends_with('/'));
        match stripped {
            Some(stem) => current = stem,
            None => return current,
        }
    }
}

/// Canonical comparison form of a page path.
///
/// Strips the content extension, resolves `.`/`..` segments, drops trailing
/// slashes and maps a trailing `index` segment to its directory. Absolute
/// inputs stay absolute: `/index.md` becomes `/`, `index` becomes `""`.
#[must_use]
pub fn normalize_for_comparison(path: &str) -> String {
    let posix = path.replace('\\', "/");
    let stripped = strip_extension_if_content_file(&posix);
    let absolute = stripped.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in stripped.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.last() == Some(&"index") {
        segments.pop();
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Whether two spellings refer to the same page.
///
/// Also true when `a` is `b` plus a literal `.md`, which happens when one side
/// was normalized from a link whose own name ends in `.md`.
///
/// ```
/// use llmstxt_site::paths_match;
///
/// assert!(paths_match("/guide/index", "/guide"));
/// assert!(!paths_match("/guide/foo", "/guide/bar"));
/// ```
#[must_use]
pub fn paths_match(a: &str, b: &str) -> bool {
    let a = normalize_for_comparison(a);
    let b = normalize_for_comparison(b);
    a == b || a.strip_suffix(".md") == Some(b.as_str())
}

/// Join a sidebar base and link into an absolute route.
///
/// Fragments and query strings are dropped.
#[must_use]
pub fn join_route(base: &str, link: &str) -> String {
    let link = link.split(['#', '?']).next().unwrap_or_default();
    let base = base.trim_matches('/');
    let link = link.trim_start_matches('/');
    match (base.is_empty(), link.is_empty()) {
        (true, _) => format!("/{link}"),
        (false, true) => format!("/{base}"),
        (false, false) => format!("/{base}/{link}"),
    }
}

/// Whether `path` lies inside `directory` (or is it). `"."` contains everything.
#[must_use]
pub fn is_within(path: &str, directory: &str) -> bool {
    let directory = directory.trim_matches('/');
    if directory.is_empty() || directory == "." {
        return true;
    }
    path.strip_prefix(directory)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Directories holding `paths`, up to `max_depth` levels deep.
///
/// The root `"."` is depth 1, `guide` depth 2, `guide/api` depth 3. Ancestors
/// of every file are included, so a directory with only nested pages still
/// gets listed. The result is sorted with `"."` first.
#[must_use]
pub fn directories_at_depth<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    max_depth: u32,
) -> Vec<String> {
    let mut dirs = BTreeSet::new();
    dirs.insert(String::new());

    let max_nested = usize::try_from(max_depth.saturating_sub(1)).unwrap_or(usize::MAX);
    for path in paths {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((_, dir_segments)) = segments.split_last() else {
            continue;
        };
        for depth in 1..=dir_segments.len().min(max_nested) {
            dirs.insert(dir_segments[..depth].join("/"));
        }
    }

    dirs.into_iter()
        .map(|d| if d.is_empty() { ".".to_owned() } else { d })
        .collect()
}
