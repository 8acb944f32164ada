//! Dynamic routes.
//!
//! A template such as `packages/[pkg].md` or `packages/[pkg]/index.md` is
//! expanded once per parameter set listed in a sidecar file next to it
//! (`packages/[pkg].paths.json`, `packages/[pkg]/index.paths.json`, or the
//! `.yaml`/`.yml` variants):
//!
//! ```json
//! [
//!   { "params": { "pkg": "core" } },
//!   { "params": { "pkg": "cli" }, "content": "Extra text" }
//! ]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::paths::to_posix;

/// Marker replaced by an instance's injected content.
pub const CONTENT_MARKER: &str = "<!-- @content -->";

const SIDECAR_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

static ROUTE_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:\.\.\.)?([^\[\]/]+)\]").unwrap());

static MUSTACHE_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*\$params\.([^}]+?)\s*\}\}").unwrap());

static BARE_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$params\.(\w+)").unwrap());

static VP_PARAMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^__VP_PARAMS_START([\s\S]*?)__VP_PARAMS_END(?:__)?(?:\r?\n)?").unwrap()
});

/// Scalar parameter value as written in a sidecar file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    content: Option<String>,
}

/// One concrete page produced from a parameterized template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRouteInstance {
    /// Absolute path of the template file.
    pub template_route: PathBuf,
    /// Source-relative path with parameters filled in (`packages/core.md`).
    pub resolved_path: String,
    /// Parameter values by name.
    pub params: BTreeMap<String, String>,
    /// Text spliced in at [`CONTENT_MARKER`].
    pub injected_content: Option<String>,
}

/// Dynamic route parameters cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum DynamicRouteError {
    /// Sidecar file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Sidecar file is malformed.
    #[error("Invalid route parameters in {path}: {message}")]
    Parse { path: String, message: String },
    /// Template path names a parameter the entry does not provide.
    #[error("Route {route} has no value for parameter {param:?}")]
    MissingParam { route: String, param: String },
}

/// Whether a source-relative path is a dynamic-route template.
///
/// Any component may carry the parameter: `packages/[pkg].md` and
/// `packages/[pkg]/index.md` both qualify.
#[must_use]
pub fn is_route_template(relative: &Path) -> bool {
    relative
        .components()
        .filter_map(|component| component.as_os_str().to_str())
        .any(|segment| ROUTE_PARAM_RE.is_match(segment))
}

/// Fill `[name]` segments of `route` with `params`.
///
/// # Errors
///
/// Returns an error if a parameter has no value.
pub fn resolve_route(
    route: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, DynamicRouteError> {
    let mut missing = None;
    let resolved = ROUTE_PARAM_RE.replace_all(route, |caps: &Captures| {
        params.get(&caps[1]).cloned().unwrap_or_else(|| {
            missing.get_or_insert_with(|| caps[1].to_owned());
            String::new()
        })
    });
    match missing {
        Some(param) => Err(DynamicRouteError::MissingParam {
            route: route.to_owned(),
            param,
        }),
        None => Ok(resolved.into_owned()),
    }
}

/// Sidecar file listing the parameter sets of `template`, if any.
fn find_sidecar(template: &Path) -> Option<PathBuf> {
    let stem = template.file_stem()?.to_str()?;
    SIDECAR_EXTENSIONS
        .iter()
        .map(|ext| template.with_file_name(format!("{stem}.paths.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn parse_sidecar(path: &Path) -> Result<Vec<RouteEntry>, DynamicRouteError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| DynamicRouteError::Io {
        path: display.clone(),
        source,
    })?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| DynamicRouteError::Parse {
        path: display,
        message,
    })
}

/// Expand every template into its route instances.
///
/// Templates without a sidecar file are skipped with a warning. Any malformed
/// sidecar fails the whole batch.
///
/// # Errors
///
/// Returns the first sidecar that cannot be read or parsed, or an entry that
/// lacks a parameter the template path uses.
pub fn load_dynamic_routes(
    work_dir: &Path,
    templates: &[PathBuf],
) -> Result<Vec<DynamicRouteInstance>, DynamicRouteError> {
    let mut instances = Vec::new();
    for template in templates {
        let Some(sidecar) = find_sidecar(template) else {
            tracing::warn!(template = %template.display(), "No route parameters file for dynamic route");
            continue;
        };
        let route = to_posix(template.strip_prefix(work_dir).unwrap_or(template));
        for entry in parse_sidecar(&sidecar)? {
            let params: BTreeMap<String, String> = entry
                .params
                .into_iter()
                .map(|(name, value)| (name, value.to_string()))
                .collect();
            instances.push(DynamicRouteInstance {
                template_route: template.clone(),
                resolved_path: resolve_route(&route, &params)?,
                params,
                injected_content: entry.content,
            });
        }
    }
    Ok(instances)
}

/// Splice `content` in place of the first [`CONTENT_MARKER`].
#[must_use]
pub fn inject_content(template: &str, content: Option<&str>) -> String {
    match content {
        Some(content) => template.replacen(CONTENT_MARKER, content, 1),
        None => template.to_owned(),
    }
}

/// Fill `{{ $params.KEY }}` and `$params.KEY` in a page title.
///
/// Keys without a value are left as written.
///
/// ```
/// use std::collections::BTreeMap;
/// use llmstxt_site::resolve_dynamic_title;
///
/// let params = BTreeMap::from([("pkg".to_owned(), "vitepress".to_owned())]);
/// assert_eq!(resolve_dynamic_title("{{ $params.pkg }} docs", &params), "vitepress docs");
/// assert_eq!(resolve_dynamic_title("{{ $params.missing }}", &params), "{{ $params.missing }}");
/// ```
#[must_use]
pub fn resolve_dynamic_title(title: &str, params: &BTreeMap<String, String>) -> String {
    let keep_unresolved = |caps: &Captures| {
        params
            .get(caps[1].trim())
            .cloned()
            .unwrap_or_else(|| caps[0].to_owned())
    };
    let title = MUSTACHE_PARAM_RE.replace_all(title, keep_unresolved);
    BARE_PARAM_RE
        .replace_all(&title, keep_unresolved)
        .into_owned()
}

/// Strip a leading `__VP_PARAMS_START<json>__VP_PARAMS_END` block and fill
/// `{{ $params.KEY }}` throughout the rest.
///
/// Keys absent from the block become empty. Text without the block is
/// returned unchanged.
///
/// # Errors
///
/// Returns an error if the block is not a JSON object.
pub fn process_vp_params(raw: &str) -> Result<String, serde_json::Error> {
    let Some(caps) = VP_PARAMS_RE.captures(raw) else {
        return Ok(raw.to_owned());
    };
    let params: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&caps[1])?;
    let rest = &raw[caps.get(0).map_or(0, |m| m.end())..];
    if params.is_empty() {
        return Ok(rest.to_owned());
    }

    let filled = MUSTACHE_PARAM_RE.replace_all(rest, |caps: &Captures| match params.get(caps[1].trim()) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    });
    Ok(filled.into_owned())
}
