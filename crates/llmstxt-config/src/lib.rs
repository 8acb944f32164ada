//! Configuration management for llmstxt.
//!
//! Parses `llmstxt.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `llms.domain`
//! - `site.base`

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override output directory.
    pub out_dir: Option<PathBuf>,
    /// Override link domain.
    pub domain: Option<String>,
    /// Override directory depth for additional index files.
    pub depth: Option<u32>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "llmstxt.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation paths (relative strings from TOML).
    docs: DocsConfigRaw,
    /// Site-level metadata shared with the documentation site.
    pub site: SiteConfig,
    /// Generation settings.
    pub llms: LlmsConfig,
    /// Source path rewrites, keyed by source pattern.
    pub rewrites: BTreeMap<String, String>,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    out_dir: Option<String>,
}

/// Resolved paths, absolute when loaded from a file.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Source directory for markdown files.
    pub source_dir: PathBuf,
    /// Directory generated files are written to.
    pub out_dir: PathBuf,
    /// Default navigation tree file (`site.sidebar`).
    pub sidebar: Option<PathBuf>,
    /// Navigation tree override used only for generation (`llms.sidebar`).
    pub llms_sidebar: Option<PathBuf>,
}

/// Site metadata.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site title.
    pub title: Option<String>,
    /// Site description.
    pub description: Option<String>,
    /// Title template used when no explicit title exists.
    pub title_template: Option<String>,
    /// Base path every link is prefixed with (e.g. `/docs`).
    pub base: String,
    /// Navigation tree file, relative to the config file.
    pub sidebar: Option<String>,
}

/// Generation settings (`[llms]`).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmsConfig {
    /// Domain prepended to every link.
    pub domain: Option<String>,
    /// Write `llms.txt`.
    pub generate_llms_txt: bool,
    /// Write `llms-full.txt`.
    pub generate_llms_full_txt: bool,
    /// Write a Markdown mirror of every page.
    pub generate_pages: bool,
    /// Remove HTML from page content.
    pub strip_html: bool,
    /// Leave the root `index.md` out of the document set.
    pub exclude_index_page: bool,
    /// Drop the extension from generated links.
    pub clean_urls: bool,
    /// Glob patterns (relative to the source directory) of files to skip.
    pub ignore_files: Vec<String>,
    /// Custom `llms.txt` template.
    pub template: Option<String>,
    /// Directory depth for additional `llms.txt` files. `1` means root only.
    pub depth: u32,
    /// Navigation tree override, relative to the config file.
    pub sidebar: Option<String>,
    /// Discover `[param].md` templates with `.paths.json` sidecars.
    pub dynamic_routes: bool,
    /// Custom template variables.
    pub variables: BTreeMap<String, String>,
}

impl Default for LlmsConfig {
    fn default() -> Self {
        Self {
            domain: None,
            generate_llms_txt: true,
            generate_llms_full_txt: true,
            generate_pages: true,
            strip_html: true,
            exclude_index_page: true,
            clean_urls: false,
            ignore_files: Vec::new(),
            template: None,
            depth: 1,
            sidebar: None,
            dynamic_routes: true,
            variables: BTreeMap::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`llms.domain`").
        field: String,
        /// Error message (e.g., "${`DOCS_HOST`} not set").
        message: String,
    },
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Normalize a site base path to `/segment` form. `/` and `""` become `""`.
fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `llmstxt.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration does not validate.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(out_dir) = &settings.out_dir {
            self.docs_resolved.out_dir.clone_from(out_dir);
        }
        if let Some(domain) = &settings.domain {
            self.llms.domain = Some(domain.trim_end_matches('/').to_owned());
        }
        if let Some(depth) = settings.depth {
            self.llms.depth = depth;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            site: SiteConfig::default(),
            llms: LlmsConfig::default(),
            rewrites: BTreeMap::new(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
                out_dir: base.join("dist"),
                sidebar: None,
                llms_sidebar: None,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.normalize();
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llms.depth == 0 {
            return Err(ConfigError::Validation(
                "llms.depth must be at least 1".to_owned(),
            ));
        }

        if let Some(domain) = &self.llms.domain {
            require_http_url(domain, "llms.domain")?;
        }

        for pattern in &self.llms.ignore_files {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "llms.ignore_files pattern {pattern:?} is not a valid glob: {e}"
                ))
            })?;
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(domain) = &mut self.llms.domain {
            expand::expand_env(domain, "llms.domain")?;
        }
        expand::expand_env(&mut self.site.base, "site.base")
    }

    /// Canonical forms for the domain and the base path.
    fn normalize(&mut self) {
        self.site.base = normalize_base(&self.site.base);
        if let Some(domain) = self.llms.domain.take() {
            let domain = domain.trim_end_matches('/');
            self.llms.domain = (!domain.is_empty()).then(|| domain.to_owned());
        }
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
            out_dir: resolve(self.docs.out_dir.as_deref(), "dist"),
            sidebar: self.site.sidebar.as_deref().map(|p| config_dir.join(p)),
            llms_sidebar: self.llms.sidebar.as_deref().map(|p| config_dir.join(p)),
        };
    }
}
