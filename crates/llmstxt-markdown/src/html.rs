//! HTML removal and heading lookup on Markdown source.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

static EXTRA_BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

/// Remove HTML blocks and inline HTML, keeping the surrounding Markdown.
///
/// HTML inside code spans and fenced blocks is content, not markup, and is
/// kept. Runs of blank lines left behind collapse to one.
pub(crate) fn strip_html(content: &str) -> String {
    let ranges: Vec<Range<usize>> = Parser::new_ext(content, parser_options())
        .into_offset_iter()
        .filter(|(event, _)| matches!(event, Event::Html(_) | Event::InlineHtml(_)))
        .map(|(_, range)| range)
        .collect();

    if ranges.is_empty() {
        return content.to_owned();
    }

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for range in ranges {
        if range.start < cursor {
            continue;
        }
        out.push_str(&content[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&content[cursor..]);

    EXTRA_BLANK_LINES_RE.replace_all(&out, "\n\n").into_owned()
}

/// Plain text of the first level-1 heading.
///
/// Inline HTML inside the heading is dropped; code spans keep their text.
#[must_use]
pub fn first_heading(content: &str) -> Option<String> {
    let mut capturing = false;
    let mut text = String::new();

    for event in Parser::new_ext(content, parser_options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => capturing = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if capturing => {
                let title = text.trim();
                if !title.is_empty() {
                    return Some(title.to_owned());
                }
                capturing = false;
                text.clear();
            }
            Event::Text(t) | Event::Code(t) if capturing => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak if capturing => text.push(' '),
            _ => {}
        }
    }

    None
}
