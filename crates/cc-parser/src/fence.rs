//! Fenced code block tracking.

/// Per-line "inside a fenced code block" flags. Fence delimiter lines count
/// as inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceMap {
    inside: Vec<bool>,
    /// 1-based line number of a fence that is never closed.
    pub unclosed: Option<usize>,
}

/// Returns `(fence char, run length)` if `line` opens or closes a fence.
pub fn is_fence_line(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    if run >= 3 {
        Some((first, run))
    } else {
        None
    }
}

impl FenceMap {
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut inside = Vec::with_capacity(lines.len());
        let mut open: Option<(char, usize, usize)> = None;

        for (idx, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            match (open, is_fence_line(line)) {
                (None, Some((ch, run))) => {
                    open = Some((ch, run, idx + 1));
                    inside.push(true);
                }
                (Some((ch, run, _)), Some((close_ch, close_run)))
                    if close_ch == ch
                        && close_run >= run
                        && line.trim().chars().all(|c| c == ch) =>
                {
                    open = None;
                    inside.push(true);
                }
                (Some(_), _) => inside.push(true),
                (None, None) => inside.push(false),
            }
        }

        Self {
            inside,
            unclosed: open.map(|(_, _, line)| line),
        }
    }

    pub fn is_inside(&self, idx: usize) -> bool {
        self.inside.get(idx).copied().unwrap_or(false)
    }

    pub fn is_balanced(&self) -> bool {
        self.unclosed.is_none()
    }
}
