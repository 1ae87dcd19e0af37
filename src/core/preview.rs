//! Human-readable change previews
//!
//! `generate_diff` is a line-presence heuristic: a line counts as removed if
//! it appears nowhere in the new text, and as added if it appears nowhere in
//! the old text. Repeated or reordered lines are miscounted. It only feeds
//! permission prompts and summary counts, never patch application.

use std::collections::HashSet;

use similar::TextDiff;

/// Approximate diff text plus add/remove counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPreview {
    pub text: String,
    pub additions: usize,
    pub removals: usize,
}

pub fn generate_diff(old: &str, new: &str, path: &str) -> DiffPreview {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let old_set: HashSet<&str> = old_lines.iter().copied().collect();
    let new_set: HashSet<&str> = new_lines.iter().copied().collect();

    let mut text = format!("--- a/{path}\n+++ b/{path}\n");
    let mut additions = 0;
    let mut removals = 0;

    for line in old_lines.iter().filter(|l| !l.is_empty() && !new_set.contains(*l)) {
        text.push('-');
        text.push_str(line);
        text.push('\n');
        removals += 1;
    }
    for line in new_lines.iter().filter(|l| !l.is_empty() && !old_set.contains(*l)) {
        text.push('+');
        text.push_str(line);
        text.push('\n');
        additions += 1;
    }

    DiffPreview { text, additions, removals }
}

/// True unified diff for terminal display
pub fn unified_diff(old: &str, new: &str, path: &str, context: usize) -> String {
    let diff = TextDiff::from_lines(old, new);
    diff.unified_diff()
        .context_radius(context)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_missing_from_the_other_side() {
        let preview = generate_diff("line1\nold line\nline3\n", "line1\nnew line\nline3\n", "/test.txt");

        assert_eq!(preview.additions, 1);
        assert_eq!(preview.removals, 1);
        assert_eq!(preview.text, "--- a//test.txt\n+++ b//test.txt\n-old line\n+new line\n");
    }

    #[test]
    fn creation_and_deletion_count_every_nonempty_line() {
        let created = generate_diff("", "a\nb\n\nc", "n.txt");
        assert_eq!((created.additions, created.removals), (3, 0));

        let deleted = generate_diff("a\nb\n", "", "d.txt");
        assert_eq!((deleted.additions, deleted.removals), (0, 2));
    }

    #[test]
    fn repeated_lines_are_undercounted() {
        // two new copies of an existing line register as nothing added
        let preview = generate_diff("x\n", "x\nx\nx\n", "f");
        assert_eq!(preview.additions, 0);
    }

    #[test]
    fn unified_diff_has_headers_and_hunks() {
        let out = unified_diff("a\nb\nc\n", "a\nB\nc\n", "f.txt", 1);
        assert!(out.starts_with("--- a/f.txt\n+++ b/f.txt\n"));
        assert!(out.contains("-b\n+B\n"));
    }
}
