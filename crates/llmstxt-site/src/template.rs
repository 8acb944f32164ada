//! `{name}` placeholder expansion and link generation.
//!
//! A placeholder preceded by a blank line owns that blank line: when the
//! value is empty both disappear, so optional sections collapse cleanly.

use std::collections::HashMap;

use regex::{Captures, Regex, RegexBuilder};

/// One template variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariable {
    /// Value to insert.
    pub value: Option<String>,
    /// Used when `value` is missing or empty.
    pub fallback: Option<String>,
}

impl TemplateVariable {
    /// Replacement text: value, else fallback, else empty.
    fn resolved(&self) -> &str {
        [self.value.as_deref(), self.fallback.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

/// Ordered set of template variables.
///
/// Names are matched case-insensitively; setting a name twice replaces the
/// earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables {
    entries: Vec<(String, TemplateVariable)>,
}

impl TemplateVariables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`.
    pub fn set(&mut self, name: &str, value: Option<String>) -> &mut Self {
        self.set_variable(
            name,
            TemplateVariable {
                value,
                fallback: None,
            },
        )
    }

    /// Give `name` a fallback for when its value is missing or empty.
    ///
    /// The current value, if any, is kept.
    pub fn set_fallback(&mut self, name: &str, fallback: &str) -> &mut Self {
        match self.find_mut(name) {
            Some(variable) => variable.fallback = Some(fallback.to_owned()),
            None => {
                self.set_variable(
                    name,
                    TemplateVariable {
                        value: None,
                        fallback: Some(fallback.to_owned()),
                    },
                );
            }
        }
        self
    }

    /// Set `name` only if it has no value yet.
    ///
    /// `value` is computed lazily so expensive values (the TOC) are skipped
    /// when a custom value exists.
    pub fn fill_with(&mut self, name: &str, value: impl FnOnce() -> Option<String>) -> &mut Self {
        let has_value = self
            .find(name)
            .is_some_and(|(_, variable)| variable.value.is_some());
        if !has_value {
            let value = value();
            match self.find_mut(name) {
                Some(variable) => variable.value = value,
                None => {
                    self.set(name, value);
                }
            }
        }
        self
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name)
            .and_then(|(_, variable)| variable.value.as_deref())
    }

    fn set_variable(&mut self, name: &str, variable: TemplateVariable) -> &mut Self {
        match self.find_mut(name) {
            Some(existing) => *existing = variable,
            None => self.entries.push((name.to_owned(), variable)),
        }
        self
    }

    fn find(&self, name: &str) -> Option<&(String, TemplateVariable)> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut TemplateVariable> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, variable)| variable)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut variables = Self::new();
        for (name, value) in iter {
            variables.set(&name.into(), Some(value.into()));
        }
        variables
    }
}

/// Regex matching `{name}` for any of `names`, with an optional blank line before it.
fn placeholder_regex<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Regex> {
    let alternation = names
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"(\n\s*\n)?\{{({alternation})\}}"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Apply a resolved value to one placeholder match.
fn substitute(caps: &Captures, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else if caps.get(1).is_some() {
        format!("\n\n{value}")
    } else {
        value.to_owned()
    }
}

/// Fill every declared variable in `template` in a single pass.
///
/// Substituted values are never rescanned, so a value containing `{toc}`
/// stays literal. Placeholders for undeclared names are left untouched.
///
/// ```
/// use llmstxt_site::{TemplateVariables, expand_template};
///
/// let vars: TemplateVariables = [("name", "Alice")].into_iter().collect();
/// assert_eq!(expand_template("Hello {name}, welcome to {place}!", &vars),
///            "Hello Alice, welcome to {place}!");
/// ```
#[must_use]
pub fn expand_template(template: &str, variables: &TemplateVariables) -> String {
    let Some(re) = placeholder_regex(variables.entries.iter().map(|(name, _)| name.as_str()))
    else {
        return template.to_owned();
    };

    let lookup: HashMap<String, &TemplateVariable> = variables
        .entries
        .iter()
        .map(|(name, variable)| (name.to_lowercase(), variable))
        .collect();

    re.replace_all(template, |caps: &Captures| {
        let value = lookup
            .get(&caps[2].to_lowercase())
            .map_or("", |variable| variable.resolved());
        substitute(caps, value)
    })
    .into_owned()
}

/// Build a page link: `{domain}/{path}{extension}`.
///
/// The extension is omitted for clean URLs; without a domain the link is
/// root-relative.
///
/// ```
/// use llmstxt_site::generate_link;
///
/// assert_eq!(generate_link("guide/intro", None, ".md", false), "/guide/intro.md");
/// assert_eq!(
///     generate_link("guide/intro", Some("https://example.com"), ".md", true),
///     "https://example.com/guide/intro"
/// );
/// ```
#[must_use]
pub fn generate_link(path: &str, domain: Option<&str>, extension: &str, clean_urls: bool) -> String {
    let domain = domain.unwrap_or("").trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let extension = if clean_urls { "" } else { extension };
    format!("{domain}/{path}{extension}")
}

/// How generated links are spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStyle {
    /// Domain prefix; `None` gives root-relative links.
    pub domain: Option<String>,
    /// Site base path, e.g. `/docs`, or empty.
    pub base: String,
    /// Extension appended to every link.
    pub extension: String,
    /// Omit the extension.
    pub clean_urls: bool,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            domain: None,
            base: String::new(),
            extension: ".md".to_owned(),
            clean_urls: false,
        }
    }
}

impl LinkStyle {
    /// Link for an extension-less page path.
    #[must_use]
    pub fn link(&self, page: &str) -> String {
        let base = self.base.trim_matches('/');
        let page = page.trim_start_matches('/');
        let path = if base.is_empty() {
            page.to_owned()
        } else {
            format!("{base}/{page}")
        };
        generate_link(&path, self.domain.as_deref(), &self.extension, self.clean_urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVariables {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_expand_simple() {
        assert_eq!(
            expand_template("Hello {name}!", &vars(&[("name", "Alice")])),
            "Hello Alice!"
        );
    }

    #[test]
    fn test_expand_empty_removes_placeholder() {
        assert_eq!(expand_template("Hello {name}!", &vars(&[("name", "")])), "Hello !");
    }

    #[test]
    fn test_expand_blank_line_kept_with_value() {
        assert_eq!(
            expand_template("Hello\n\n{name}!", &vars(&[("name", "Alice")])),
            "Hello\n\nAlice!"
        );
    }

    #[test]
    fn test_expand_blank_line_removed_without_value() {
        assert_eq!(
            expand_template("Hello\n\n{name}\n\nBye", &vars(&[("name", "")])),
            "Hello\n\nBye"
        );
    }

    #[test]
    fn test_expand_case_insensitive() {
        assert_eq!(
            expand_template("{TITLE} / {Title}", &vars(&[("title", "Docs")])),
            "Docs / Docs"
        );
    }

    #[test]
    fn test_expand_undeclared_untouched() {
        assert_eq!(
            expand_template("{a} {b}", &vars(&[("a", "1")])),
            "1 {b}"
        );
    }

    #[test]
    fn test_expand_declared_none_removed() {
        let mut variables = TemplateVariables::new();
        variables.set("title", None);
        assert_eq!(expand_template("# {title}", &variables), "# ");
    }

    #[test]
    fn test_expand_uses_fallback() {
        let mut variables = TemplateVariables::new();
        variables.set("details", Some(String::new()));
        variables.set_fallback("details", "Default");
        assert_eq!(expand_template("A\n\n{details}", &variables), "A\n\nDefault");

        variables.set_fallback("name", "World");
        assert_eq!(expand_template("Hello {name}!", &variables), "Hello World!");
        assert_eq!(variables.get("name"), None);
    }

    #[test]
    fn test_expand_values_not_rescanned() {
        let variables = vars(&[("title", "{toc}"), ("toc", "TOC")]);
        assert_eq!(expand_template("{title} {toc}", &variables), "{toc} TOC");
    }

    #[test]
    fn test_expand_default_index_template() {
        let template = "# {title}\n\n> {description}\n\n{details}\n\n## Table of Contents\n\n{toc}";
        let mut variables = TemplateVariables::new();
        variables
            .set("title", Some("Docs".to_owned()))
            .set("description", None)
            .set("details", None)
            .set("toc", Some("- [A](/a.md)\n".to_owned()));
        assert_eq!(
            expand_template(template, &variables),
            "# Docs\n\n> \n\n## Table of Contents\n\n- [A](/a.md)\n"
        );
    }

    #[test]
    fn test_fill_with_keeps_existing() {
        let mut variables = TemplateVariables::new();
        variables.set("title", Some("Custom".to_owned()));
        variables.fill_with("title", || Some("Computed".to_owned()));
        variables.fill_with("toc", || Some("TOC".to_owned()));
        assert_eq!(variables.get("title"), Some("Custom"));
        assert_eq!(variables.get("TOC"), Some("TOC"));
    }

    #[test]
    fn test_fill_with_replaces_missing_value() {
        let mut variables = TemplateVariables::new();
        variables.set("description", None);
        variables.fill_with("description", || Some("Filled".to_owned()));
        assert_eq!(variables.get("description"), Some("Filled"));
    }

    #[test]
    fn test_generate_link() {
        assert_eq!(generate_link("test/a", None, ".md", false), "/test/a.md");
        assert_eq!(
            generate_link("test/a", Some("https://example.com/"), ".html", false),
            "https://example.com/test/a.html"
        );
        assert_eq!(generate_link("test/a", None, ".md", true), "/test/a");
    }

    #[test]
    fn test_link_style_with_base() {
        let style = LinkStyle {
            base: "/docs".to_owned(),
            ..LinkStyle::default()
        };
        assert_eq!(style.link("guide/intro"), "/docs/guide/intro.md");
        assert_eq!(LinkStyle::default().link("guide/intro"), "/guide/intro.md");
    }
}
