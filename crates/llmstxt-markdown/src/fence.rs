//! Fenced code block tracking for line-based preprocessing.

/// Opening fence of the block we are currently inside.
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

/// Tracks whether the current line sits inside a fenced code block.
///
/// Include markers and snippet imports inside fences are left as literal text.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<Fence>,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one line. Returns `true` when the line opens or closes a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let Some(run) = fence_run(line.trim_start()) else {
            return false;
        };

        match self.open {
            Some(open) => {
                let closes = run.marker == open.marker
                    && run.len >= open.len
                    && line.trim_start()[run.len..].trim().is_empty();
                if closes {
                    self.open = None;
                }
                closes
            }
            None => {
                self.open = Some(run);
                true
            }
        }
    }
}

/// Leading run of three or more backticks or tildes.
fn fence_run(trimmed: &str) -> Option<Fence> {
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    (len >= 3).then_some(Fence { marker, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_backtick_block() {
        let mut tracker = FenceTracker::new();
        assert!(!tracker.in_fence());
        assert!(tracker.update("```md"));
        assert!(tracker.in_fence());
        assert!(!tracker.update("<!-- @include: ./a.md -->"));
        assert!(tracker.in_fence());
        assert!(tracker.update("```"));
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_shorter_or_different_fence_does_not_close() {
        let mut tracker = FenceTracker::new();
        tracker.update("````");
        assert!(!tracker.update("```"));
        assert!(!tracker.update("~~~~"));
        assert!(tracker.in_fence());
        assert!(tracker.update("`````"));
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_closing_fence_with_info_is_content() {
        let mut tracker = FenceTracker::new();
        tracker.update("~~~");
        assert!(!tracker.update("~~~ js"));
        assert!(tracker.in_fence());
    }

    #[test]
    fn test_two_backticks_are_not_a_fence() {
        let mut tracker = FenceTracker::new();
        assert!(!tracker.update("``inline``"));
        assert!(!tracker.in_fence());
    }
}
