//! `<llm-only>` and `<llm-exclude>` blocks.
//!
//! Content wrapped in `<llm-only>` is meant for generated output only, so the
//! tags are dropped and the content kept. `<llm-exclude>` blocks are for human
//! readers and disappear entirely.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static LLM_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<llm-only>(.*?)</llm-only>").unwrap());

static LLM_EXCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<llm-exclude>.*?</llm-exclude>").unwrap());

/// Unwrap `<llm-only>` blocks and remove `<llm-exclude>` blocks.
pub(crate) fn apply_llm_tags(content: &str) -> String {
    if !content.contains("<llm-") {
        return content.to_owned();
    }
    let unwrapped = LLM_ONLY_RE.replace_all(content, |caps: &Captures| caps[1].to_owned());
    LLM_EXCLUDE_RE.replace_all(&unwrapped, "").into_owned()
}
