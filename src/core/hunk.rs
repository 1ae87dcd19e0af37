//! Hunk compiler
//!
//! Scans the body lines that follow an `@@` header and turns them into the
//! context block used for locating the hunk plus a list of chunks whose
//! `orig_index` is relative to the start of that context block.

use crate::core::types::Chunk;

/// Marker that pins the preceding hunk to the end of the file
pub const END_OF_FILE: &str = "*** End of File";

/// Result of compiling one hunk body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledHunk {
    /// Original-content lines (kept + deleted), in order
    pub context: Vec<String>,
    /// Chunks relative to the start of `context`
    pub chunks: Vec<Chunk>,
    /// Index of the first line after this hunk
    pub next: usize,
    /// Whether the hunk ended with `*** End of File`
    pub eof: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Keep,
    Add,
    Delete,
}

/// Lines that end a hunk body
fn ends_section(line: &str) -> bool {
    // Every directive and the EOF marker start with "***"
    line.starts_with("@@") || line.starts_with("***")
}

/// Compile the hunk body starting at `start`.
pub fn compile_hunk(lines: &[String], start: usize) -> CompiledHunk {
    let mut index = start;
    let mut context: Vec<String> = Vec::with_capacity(32);
    let mut del_lines: Vec<String> = Vec::new();
    let mut ins_lines: Vec<String> = Vec::new();
    let mut chunks = Vec::new();
    let mut mode = Mode::Keep;

    while index < lines.len() {
        let raw = &lines[index];
        if ends_section(raw) {
            break;
        }
        index += 1;

        let last_mode = mode;
        let (next_mode, text) = classify(raw);
        mode = next_mode;

        // Returning to kept lines closes the open run
        if mode == Mode::Keep && last_mode != Mode::Keep {
            close_run(&mut chunks, &context, &mut del_lines, &mut ins_lines);
        }

        match mode {
            Mode::Delete => {
                del_lines.push(text.to_string());
                context.push(text.to_string());
            }
            Mode::Add => ins_lines.push(text.to_string()),
            Mode::Keep => context.push(text.to_string()),
        }
    }

    close_run(&mut chunks, &context, &mut del_lines, &mut ins_lines);

    let eof = lines.get(index).is_some_and(|l| l == END_OF_FILE);
    if eof {
        index += 1;
    }

    CompiledHunk { context, chunks, next: index, eof }
}

/// Split a body line into its mode and payload.
/// Unknown leading characters are kept lines, payload intact.
fn classify(line: &str) -> (Mode, &str) {
    match line.as_bytes().first() {
        Some(b'+') => (Mode::Add, &line[1..]),
        Some(b'-') => (Mode::Delete, &line[1..]),
        Some(b' ') => (Mode::Keep, &line[1..]),
        Some(_) => (Mode::Keep, line),
        None => (Mode::Keep, ""),
    }
}

fn close_run(
    chunks: &mut Vec<Chunk>,
    context: &[String],
    del_lines: &mut Vec<String>,
    ins_lines: &mut Vec<String>,
) {
    if del_lines.is_empty() && ins_lines.is_empty() {
        return;
    }
    chunks.push(Chunk {
        orig_index: context.len() - del_lines.len(),
        del_lines: std::mem::take(del_lines),
        ins_lines: std::mem::take(ins_lines),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn replacement_becomes_one_chunk() {
        let body = lines(" a\n-b\n+B\n c\n*** End Patch");
        let hunk = compile_hunk(&body, 0);

        assert_eq!(hunk.context, vec!["a", "b", "c"]);
        assert_eq!(
            hunk.chunks,
            vec![Chunk { orig_index: 1, del_lines: vec!["b".into()], ins_lines: vec!["B".into()] }]
        );
        assert_eq!(hunk.next, 4);
        assert!(!hunk.eof);
    }

    #[test]
    fn separate_runs_produce_separate_chunks() {
        let body = lines("+head\n a\n-b\n c\n+tail");
        let hunk = compile_hunk(&body, 0);

        assert_eq!(hunk.chunks.len(), 3);
        assert_eq!(hunk.chunks[0].orig_index, 0);
        assert_eq!(hunk.chunks[1].orig_index, 1);
        assert_eq!(hunk.chunks[1].del_lines, vec!["b"]);
        // trailing run is closed at end of hunk
        assert_eq!(hunk.chunks[2].orig_index, 3);
        assert_eq!(hunk.chunks[2].ins_lines, vec!["tail"]);
    }

    #[test]
    fn unmarked_and_empty_lines_are_context() {
        let body = lines("plain\n\n-x");
        let hunk = compile_hunk(&body, 0);

        assert_eq!(hunk.context, vec!["plain", "", "x"]);
        assert_eq!(hunk.chunks[0].orig_index, 2);
    }

    #[test]
    fn stops_at_headers_and_consumes_eof_marker() {
        let body = lines(" a\n+b\n@@ next\n c");
        assert_eq!(compile_hunk(&body, 0).next, 2);

        let body = lines(" a\n+b\n*** End of File\n*** End Patch");
        let hunk = compile_hunk(&body, 0);
        assert!(hunk.eof);
        assert_eq!(hunk.next, 3);
    }
}
