//! Build progress reporting on stderr.

use console::{Style, Term};
use llmstxt_site::GeneratedFile;

/// Width of the rule above the run summary.
const RULE_WIDTH: usize = 70;

/// How a line is colored.
#[derive(Debug, Clone, Copy)]
enum Tone {
    Plain,
    Success,
    Warning,
    Error,
    Emphasis,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Self::Plain => Style::new(),
            Self::Success => Style::new().green(),
            Self::Warning => Style::new().yellow(),
            Self::Error => Style::new().red(),
            Self::Emphasis => Style::new().cyan().bold(),
        }
    }
}

/// Reporter for the build command.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn line(&self, tone: Tone, msg: &str) {
        let _ = self.term.write_line(&tone.style().apply_to(msg).to_string());
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(Tone::Plain, msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(Tone::Success, msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(Tone::Warning, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(Tone::Error, msg);
    }

    /// Report one written bundle, e.g.
    /// `Generated guide/llms.txt (~310 tokens, 1.2 kB) with 4 documentation links`.
    pub(crate) fn generated(&self, name: &str, file: &GeneratedFile, detail: &str) {
        let emphasis = Tone::Emphasis.style();
        let bold = Style::new().bold();
        let line = format!(
            "Generated {} (~{} tokens, {}) {detail}",
            emphasis.apply_to(name),
            bold.apply_to(file.tokens),
            bold.apply_to(file.size()),
        );
        let _ = self.term.write_line(&line);
    }

    /// Closing rule and one-line run summary.
    pub(crate) fn summary(&self, documents: usize, skipped: usize, tasks: (usize, usize)) {
        let (succeeded, attempted) = tasks;
        let _ = self.term.write_line(&"=".repeat(RULE_WIDTH));
        let tone = if succeeded == attempted {
            Tone::Emphasis
        } else {
            Tone::Warning
        };
        self.line(
            tone,
            &format!(
                "{documents} documents, {skipped} skipped, {succeeded} of {attempted} tasks succeeded"
            ),
        );
    }
}
