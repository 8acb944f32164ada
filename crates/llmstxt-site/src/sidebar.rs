//! Navigation tree model.
//!
//! A sidebar is either a list of sections or a mapping from path prefix to
//! per-prefix sections (`{"/guide/": [...], "/api/": {base, items}}`). Both
//! shapes are flattened into one ordered list of sections before the TOC is
//! built.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

/// One sidebar node: a section heading, a link, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SidebarItem {
    /// Display text (section heading or link label).
    pub text: Option<String>,
    /// Page link, e.g. `/guide/intro`.
    pub link: Option<String>,
    /// Nested items.
    pub items: Vec<SidebarItem>,
    /// Path prefix inherited by descendants.
    pub base: Option<String>,
    /// Collapsed state in the site UI. Not used for generation.
    pub collapsed: Option<bool>,
}

impl SidebarItem {
    /// Section with a heading and items.
    #[must_use]
    pub fn section(text: &str, items: Vec<SidebarItem>) -> Self {
        Self {
            text: Some(text.to_owned()),
            items,
            ..Self::default()
        }
    }

    /// Leaf link.
    #[must_use]
    pub fn link(text: &str, link: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            link: Some(link.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(base.to_owned());
        self
    }
}

/// Per-prefix entry of a multi-sidebar in object form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct SidebarGroup {
    base: Option<String>,
    items: Vec<SidebarItem>,
}

/// Sidebar in either shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sidebar {
    /// Plain list of sections.
    Items(Vec<SidebarItem>),
    /// Prefix-keyed sections in declaration order.
    Multi(Vec<(String, Vec<SidebarItem>)>),
}

/// Sidebar file cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum SidebarError {
    /// File could not be read.
    #[error("Failed to read sidebar {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// YAML/JSON is malformed or has the wrong shape.
    #[error("Invalid sidebar: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Top-level value is neither a list nor a mapping.
    #[error("Sidebar must be a list of items or a mapping of path prefixes")]
    Shape,
}

impl Sidebar {
    /// Parse a sidebar from YAML (JSON is accepted too).
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input or an unexpected top-level shape.
    pub fn from_yaml(text: &str) -> Result<Self, SidebarError> {
        match serde_yaml::from_str::<Value>(text)? {
            Value::Sequence(_) => Ok(Self::Items(serde_yaml::from_str(text)?)),
            Value::Mapping(mapping) => {
                let mut groups = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let Some(prefix) = key.as_str() else {
                        return Err(SidebarError::Shape);
                    };
                    let items = match value {
                        Value::Sequence(_) => serde_yaml::from_value(value)?,
                        Value::Mapping(_) => {
                            let group: SidebarGroup = serde_yaml::from_value(value)?;
                            vec![SidebarItem {
                                base: group.base,
                                items: group.items,
                                ..SidebarItem::default()
                            }]
                        }
                        _ => return Err(SidebarError::Shape),
                    };
                    groups.push((prefix.to_owned(), items));
                }
                Ok(Self::Multi(groups))
            }
            _ => Err(SidebarError::Shape),
        }
    }

    /// Load a sidebar file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SidebarError> {
        let text = std::fs::read_to_string(path).map_err(|source| SidebarError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Flatten into one ordered list of sections.
    #[must_use]
    pub fn into_sections(self) -> Vec<SidebarItem> {
        match self {
            Self::Items(items) => items,
            Self::Multi(groups) => groups.into_iter().flat_map(|(_, items)| items).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Items(items) => items.is_empty(),
            Self::Multi(groups) => groups.iter().all(|(_, items)| items.is_empty()),
        }
    }
}

/// Derives the sidebar from the site default.
pub type SidebarResolver = Box<dyn FnOnce(Option<Sidebar>) -> Option<Sidebar> + Send>;

/// Sidebar configured for generation.
pub enum SidebarSetting {
    /// Fixed value. `None` defers to the site default.
    Static(Option<Sidebar>),
    /// Computed from the site default.
    Resolver(SidebarResolver),
}

impl SidebarSetting {
    /// Resolve against the site's default sidebar.
    #[must_use]
    pub fn resolve(self, default: Option<Sidebar>) -> Option<Sidebar> {
        match self {
            Self::Static(Some(sidebar)) => Some(sidebar),
            Self::Static(None) => default,
            Self::Resolver(resolve) => resolve(default),
        }
    }
}

impl fmt::Debug for SidebarSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(sidebar) => f.debug_tuple("Static").field(sidebar).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}
