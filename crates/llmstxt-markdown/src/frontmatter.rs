//! YAML frontmatter parsing and re-serialization.

use serde_yaml::{Mapping, Value};

use crate::MarkdownError;

/// Parsed frontmatter block.
///
/// Keys keep their source order so re-serialized blocks read like the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter(Mapping);

impl Frontmatter {
    /// Empty frontmatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML block (without the `---` delimiters).
    ///
    /// Blank input yields an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or is not a mapping.
    pub fn parse(yaml: &str) -> Result<Self, MarkdownError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(mapping) => Ok(Self(mapping)),
            Value::Null => Ok(Self::default()),
            _ => Err(MarkdownError::FrontmatterShape),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Scalar value for `key` rendered as a string.
    ///
    /// Strings, numbers and booleans are returned; mappings, sequences and
    /// null are not.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// Scalar value at a nested key path, e.g. `["hero", "name"]`.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<String> {
        let (first, rest) = path.split_first()?;
        let mut value = self.get(first)?;
        for key in rest {
            value = value.as_mapping()?.get(*key)?;
        }
        scalar_to_string(value)
    }

    /// Set `key` to a string value, replacing any existing entry in place.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .insert(Value::String(key.to_owned()), Value::String(value.into()));
    }

    /// Render `content` with this frontmatter as a leading `---` block.
    ///
    /// The output always ends with a newline. An empty mapping produces no
    /// block at all.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be serialized.
    pub fn stringify(&self, content: &str) -> Result<String, MarkdownError> {
        let mut out = String::with_capacity(content.len() + 64);
        if !self.is_empty() {
            let yaml = serde_yaml::to_string(&self.0)?;
            out.push_str("---\n");
            out.push_str(yaml.trim_end());
            out.push_str("\n---\n");
        }
        out.push_str(content);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Split a leading `---` block from the body.
///
/// Returns `(Some(yaml), body)` when the text opens with a delimiter line and
/// a closing `---` (or `...`) line exists, otherwise `(None, raw)`.
#[must_use]
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let Some(after_open) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        let marker = line.trim_end_matches(['\r', '\n']);
        if marker == "---" || marker == "..." {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_frontmatter() {
        let raw = "---\ntitle: Guide\n---\n\n# Guide\n";
        let (yaml, body) = split_frontmatter(raw);
        assert_eq!(yaml, Some("title: Guide\n"));
        assert_eq!(body, "\n# Guide\n");
    }

    #[test]
    fn test_split_without_frontmatter() {
        let raw = "# Guide\n\n---\n\nText";
        assert_eq!(split_frontmatter(raw), (None, raw));
    }

    #[test]
    fn test_split_unterminated_block() {
        let raw = "---\ntitle: Guide\n# Guide";
        assert_eq!(split_frontmatter(raw), (None, raw));
    }

    #[test]
    fn test_split_empty_block_at_end() {
        let (yaml, body) = split_frontmatter("---\n---");
        assert_eq!(yaml, Some(""));
        assert_eq!(body, "");
    }

    #[test]
    fn test_parse_scalars() {
        let fm = Frontmatter::parse("title: Guide\norder: 3\ndraft: false\n").unwrap();
        assert_eq!(fm.get_str("title").as_deref(), Some("Guide"));
        assert_eq!(fm.get_str("order").as_deref(), Some("3"));
        assert_eq!(fm.get_str("draft").as_deref(), Some("false"));
        assert_eq!(fm.get_str("missing"), None);
    }

    #[test]
    fn test_parse_nested_path() {
        let yaml = "hero:\n  name: VitePress\n  text: Static site generator\n";
        let fm = Frontmatter::parse(yaml).unwrap();
        assert_eq!(fm.get_path(&["hero", "name"]).as_deref(), Some("VitePress"));
        assert_eq!(fm.get_path(&["hero", "tagline"]), None);
        assert_eq!(fm.get_str("hero"), None);
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = Frontmatter::parse("- a\n- b\n").unwrap_err();
        assert!(matches!(err, MarkdownError::FrontmatterShape));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = Frontmatter::parse("title: [unclosed\n").unwrap_err();
        assert!(matches!(err, MarkdownError::Frontmatter(_)));
    }

    #[test]
    fn test_stringify_block() {
        let mut fm = Frontmatter::new();
        fm.insert("url", "/guide.md");
        fm.insert("description", "All about guides");
        let text = fm.stringify("\n# Guide").unwrap();
        assert_eq!(
            text,
            "---\nurl: /guide.md\ndescription: All about guides\n---\n\n# Guide\n"
        );
    }

    #[test]
    fn test_stringify_empty_mapping() {
        let text = Frontmatter::new().stringify("# Guide\n").unwrap();
        assert_eq!(text, "# Guide\n");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut fm = Frontmatter::parse("title: Old\nurl: x\n").unwrap();
        fm.insert("title", "New");
        let text = fm.stringify("").unwrap();
        assert_eq!(text, "---\ntitle: New\nurl: x\n---\n");
    }
}
