//! Patch text parser
//!
//! Turns the `*** Begin Patch` ... `*** End Patch` format into a [`Patch`]
//! against a set of current file snapshots:
//! - `*** Update File: <path>` (optionally followed by `*** Move to: <path>`)
//! - `*** Add File: <path>` with `+`-prefixed content lines
//! - `*** Delete File: <path>`
//!
//! Parsing fails on the first problem; a partial patch is never returned.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::{
    error::DiffError,
    hunk::{END_OF_FILE, compile_hunk},
    resolve::find_context,
    types::{Patch, PatchAction},
};

pub const BEGIN_PATCH: &str = "*** Begin Patch";
pub const END_PATCH: &str = "*** End Patch";
pub const UPDATE_FILE: &str = "*** Update File: ";
pub const ADD_FILE: &str = "*** Add File: ";
pub const DELETE_FILE: &str = "*** Delete File: ";
pub const MOVE_TO: &str = "*** Move to: ";

/// Prefixes that end an Add File body
const ADD_TERMINATORS: [&str; 4] = [END_PATCH, "*** Update File:", "*** Delete File:", "*** Add File:"];

/// Prefixes that end an Update File body
const UPDATE_TERMINATORS: [&str; 5] =
    [END_PATCH, "*** Update File:", "*** Delete File:", "*** Add File:", END_OF_FILE];

/// Current file contents keyed by the path as written in the patch
pub type Snapshots = HashMap<String, String>;

/// Parse `text` into a patch and its accumulated fuzz.
pub fn text_to_patch(text: &str, snapshots: &Snapshots) -> Result<(Patch, usize), DiffError> {
    let lines = split_lines(text);
    let envelope_ok = lines.len() >= 2
        && lines[0].starts_with(BEGIN_PATCH)
        && lines.last().is_some_and(|l| l == END_PATCH);
    if !envelope_ok {
        return Err(DiffError::InvalidFormat);
    }

    let mut parser = Parser::new(snapshots, &lines);
    parser.index = 1;
    parser.parse()?;
    Ok((parser.patch, parser.fuzz))
}

/// Paths that must exist before the patch is applied (Update + Delete)
pub fn identify_files_needed(text: &str) -> Vec<String> {
    scan_directives(text, &[UPDATE_FILE, DELETE_FILE])
}

/// Paths the patch creates (Add)
pub fn identify_files_added(text: &str) -> Vec<String> {
    scan_directives(text, &[ADD_FILE])
}

/// Destinations of `*** Move to:` directives
pub fn identify_move_targets(text: &str) -> Vec<String> {
    scan_directives(text, &[MOVE_TO])
}

/// `(source, destination)` for every Update directive followed by a move
pub fn identify_moves(text: &str) -> Vec<(String, String)> {
    split_lines(text)
        .windows(2)
        .filter_map(|pair| {
            let source = pair[0].strip_prefix(UPDATE_FILE)?;
            let dest = pair[1].strip_prefix(MOVE_TO)?;
            Some((source.to_string(), dest.to_string()))
        })
        .collect()
}

/// Cheap textual scan, independent of a full parse
fn scan_directives(text: &str, prefixes: &[&str]) -> Vec<String> {
    let found: BTreeSet<String> = split_lines(text)
        .iter()
        .filter_map(|line| {
            prefixes
                .iter()
                .find_map(|p| line.strip_prefix(p))
                .map(str::to_string)
        })
        .collect();
    found.into_iter().collect()
}

fn split_lines(text: &str) -> Vec<String> {
    text.trim()
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect()
}

/// Single-use parser; owns its cursor and the patch under construction
struct Parser<'a> {
    snapshots: &'a Snapshots,
    lines: &'a [String],
    index: usize,
    patch: Patch,
    fuzz: usize,
    /// Move destinations seen so far
    moved_to: HashSet<String>,
}

impl<'a> Parser<'a> {
    fn new(snapshots: &'a Snapshots, lines: &'a [String]) -> Self {
        Self { snapshots, lines, index: 0, patch: Patch::default(), fuzz: 0, moved_to: HashSet::new() }
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.index).map(String::as_str)
    }

    fn is_done(&self, prefixes: &[&str]) -> bool {
        match self.current() {
            None => true,
            Some(line) => prefixes.iter().any(|p| line.starts_with(p)),
        }
    }

    /// Consume the current line if it starts with `prefix`, returning the rest.
    /// An empty remainder counts as absent.
    fn read_str(&mut self, prefix: &str) -> Option<&'a str> {
        let rest = self.current()?.strip_prefix(prefix)?;
        self.index += 1;
        (!rest.is_empty()).then_some(rest)
    }

    fn parse(&mut self) -> Result<(), DiffError> {
        while !self.is_done(&[END_PATCH]) {
            if let Some(path) = self.read_str(UPDATE_FILE) {
                self.ensure_unique("Update", path)?;
                let move_to = self.read_str(MOVE_TO).map(str::to_string);
                if let Some(dest) = move_to.as_deref().filter(|dest| *dest != path) {
                    self.ensure_unique("Update", dest)?;
                    self.moved_to.insert(dest.to_string());
                }
                let snapshots = self.snapshots;
                let text = snapshots
                    .get(path)
                    .ok_or_else(|| DiffError::MissingFile { action: "Update", path: path.to_string() })?;
                let action = self.parse_update_file(text, move_to)?;
                self.patch.actions.insert(path.to_string(), action);
                continue;
            }

            if let Some(path) = self.read_str(DELETE_FILE) {
                self.ensure_unique("Delete", path)?;
                if !self.snapshots.contains_key(path) {
                    return Err(DiffError::MissingFile { action: "Delete", path: path.to_string() });
                }
                self.patch.actions.insert(path.to_string(), PatchAction::delete());
                continue;
            }

            if let Some(path) = self.read_str(ADD_FILE) {
                self.ensure_unique("Add", path)?;
                if self.snapshots.contains_key(path) {
                    return Err(DiffError::FileAlreadyExists { path: path.to_string() });
                }
                let action = self.parse_add_file()?;
                self.patch.actions.insert(path.to_string(), action);
                continue;
            }

            let line = self.current().unwrap_or_default().to_string();
            return Err(DiffError::UnknownLine { line });
        }

        if !self.current().is_some_and(|l| l.starts_with(END_PATCH)) {
            return Err(DiffError::MissingEndPatch);
        }
        self.index += 1;
        Ok(())
    }

    fn ensure_unique(&self, action: &'static str, path: &str) -> Result<(), DiffError> {
        if self.patch.actions.contains_key(path) || self.moved_to.contains(path) {
            return Err(DiffError::DuplicatePath { action, path: path.to_string() });
        }
        Ok(())
    }

    fn parse_update_file(&mut self, text: &str, move_to: Option<String>) -> Result<PatchAction, DiffError> {
        let file_lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let mut chunks = Vec::new();
        let mut cursor = 0usize;
        let mut hunks = 0usize;

        while !self.is_done(&UPDATE_TERMINATORS) {
            let header = self.read_header();
            if header.is_none() && hunks > 0 {
                return Err(self.invalid_line());
            }

            if let Some(label) = header.filter(|l| !l.trim().is_empty()) {
                cursor = self.seek_label(&file_lines, label, cursor);
            }

            let hunk = compile_hunk(self.lines, self.index);
            if header.is_none() && hunk.next == self.index {
                // nothing consumed; the line belongs to no grammar
                return Err(self.invalid_line());
            }

            let found = find_context(&file_lines, &hunk.context, cursor, hunk.eof)
                .ok_or_else(|| DiffError::context(cursor, &hunk.context, hunk.eof))?;
            self.fuzz += found.fuzz;

            chunks.extend(hunk.chunks.into_iter().map(|mut chunk| {
                chunk.orig_index += found.index;
                chunk
            }));
            cursor = found.index + hunk.context.len();
            self.index = hunk.next;
            hunks += 1;
        }

        Ok(PatchAction::update(chunks, move_to))
    }

    /// `@@ <label>` yields the label, a bare `@@` yields "".
    fn read_header(&mut self) -> Option<&'a str> {
        let line = self.current()?;
        if let Some(label) = line.strip_prefix("@@ ") {
            self.index += 1;
            return Some(label);
        }
        if line == "@@" {
            self.index += 1;
            return Some("");
        }
        None
    }

    /// Move the cursor past a header label line. Labels already behind the
    /// cursor leave it in place; only a trimmed forward hit costs fuzz.
    fn seek_label(&mut self, file_lines: &[String], label: &str, cursor: usize) -> usize {
        let consumed = &file_lines[..cursor.min(file_lines.len())];

        if consumed.iter().any(|l| l == label) {
            return cursor;
        }
        if let Some(i) = (cursor..file_lines.len()).find(|&i| file_lines[i] == label) {
            return i + 1;
        }
        if consumed.iter().any(|l| l.trim() == label.trim()) {
            return cursor;
        }
        if let Some(i) = (cursor..file_lines.len()).find(|&i| file_lines[i].trim() == label.trim()) {
            self.fuzz += 1;
            return i + 1;
        }
        cursor
    }

    fn invalid_line(&self) -> DiffError {
        DiffError::InvalidLine { line: self.current().unwrap_or_default().to_string() }
    }

    fn parse_add_file(&mut self) -> Result<PatchAction, DiffError> {
        let mut lines = Vec::with_capacity(16);
        while !self.is_done(&ADD_TERMINATORS) {
            let line = self.current().unwrap_or_default();
            self.index += 1;
            match line.strip_prefix('+') {
                Some(content) => lines.push(content),
                None => return Err(DiffError::InvalidAddLine { line: line.to_string() }),
            }
        }
        Ok(PatchAction::add(lines.join("\n")))
    }
}
