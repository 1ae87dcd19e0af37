//! Context resolver
//!
//! Locates a hunk's context block inside the current file lines using
//! progressively relaxed equality. Every relaxation costs fuzz, so the
//! caller can refuse a patch that needed too much guessing.

/// Penalty added when an EOF-anchored hunk had to float
pub const EOF_FALLBACK_PENALTY: usize = 10_000;

/// Line comparison strategies, strictest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Exact,
    TrimEnd,
    Trim,
}

impl Strictness {
    pub const ALL: [Strictness; 3] = [Strictness::Exact, Strictness::TrimEnd, Strictness::Trim];

    /// Fuzz contributed by a match under this strategy
    pub fn penalty(self) -> usize {
        match self {
            Strictness::Exact => 0,
            Strictness::TrimEnd => 1,
            Strictness::Trim => 100,
        }
    }

    pub fn eq(self, a: &str, b: &str) -> bool {
        match self {
            Strictness::Exact => a == b,
            Strictness::TrimEnd => a.trim_end() == b.trim_end(),
            Strictness::Trim => a.trim() == b.trim(),
        }
    }
}

/// Where a context block landed and what it cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMatch {
    pub index: usize,
    pub fuzz: usize,
}

/// Find `context` in `lines` at or after `start`.
///
/// With `eof` set the block is first tried flush against the end of the
/// file; if that fails the free search result carries
/// [`EOF_FALLBACK_PENALTY`].
pub fn find_context(
    lines: &[String],
    context: &[String],
    start: usize,
    eof: bool,
) -> Option<ContextMatch> {
    if !eof {
        return find_context_core(lines, context, start);
    }

    // A newline-terminated file splits into a trailing "" element
    let content_len = match lines.last() {
        Some(last) if last.is_empty() => lines.len() - 1,
        _ => lines.len(),
    };
    if let Some(anchor) = content_len.checked_sub(context.len()) {
        if let Some(found) = find_context_core(lines, context, anchor.max(start)) {
            return Some(found);
        }
    }

    find_context_core(lines, context, start).map(|m| ContextMatch {
        index: m.index,
        fuzz: m.fuzz + EOF_FALLBACK_PENALTY,
    })
}

fn find_context_core(lines: &[String], context: &[String], start: usize) -> Option<ContextMatch> {
    if context.is_empty() {
        return Some(ContextMatch { index: start, fuzz: 0 });
    }

    Strictness::ALL.into_iter().find_map(|strictness| {
        seek(lines, context, start, strictness).map(|index| ContextMatch {
            index,
            fuzz: strictness.penalty(),
        })
    })
}

fn seek(lines: &[String], context: &[String], start: usize, strictness: Strictness) -> Option<usize> {
    let last_start = lines.len().checked_sub(context.len())?;
    (start..=last_start).find(|&i| {
        lines[i..i + context.len()]
            .iter()
            .zip(context)
            .all(|(line, ctx)| strictness.eq(line, ctx))
    })
}
