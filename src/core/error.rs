//! Error taxonomy for the patch engine and the patch tool
//!
//! `DiffError` covers everything detected while turning patch text into a
//! commit; none of it can happen after a file has been touched. `ToolError`
//! wraps those and adds the orchestrator's own failure classes.

use std::path::PathBuf;

use crate::core::permission::PermissionAction;

/// Parse and validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Text lacks the Begin/End Patch envelope
    #[error("Invalid patch text: expected '*** Begin Patch' ... '*** End Patch'")]
    InvalidFormat,

    #[error("{action} File Error: Duplicate Path: {path}")]
    DuplicatePath { action: &'static str, path: String },

    #[error("{action} File Error: Missing File: {path}")]
    MissingFile { action: &'static str, path: String },

    #[error("Add File Error: File already exists: {path}")]
    FileAlreadyExists { path: String },

    #[error("Unknown Line: {line}")]
    UnknownLine { line: String },

    /// A hunk after the first one came without an `@@` header
    #[error("Invalid Line:\n{line}")]
    InvalidLine { line: String },

    #[error("Invalid Add File Line: {line}")]
    InvalidAddLine { line: String },

    #[error("Invalid Context at index {index}:\n{context}")]
    InvalidContext { index: usize, context: String },

    #[error("Invalid EOF Context at index {index}:\n{context}")]
    InvalidEofContext { index: usize, context: String },

    #[error("Missing End Patch")]
    MissingEndPatch,

    #[error("Update action for missing file: {path}")]
    MissingSnapshot { path: String },

    #[error("Chunk at line {index} is out of range or overlaps another chunk in {path}")]
    ChunkOutOfRange { path: String, index: usize },
}

impl DiffError {
    /// Context-not-found error, picking the EOF flavour when anchored
    pub fn context(index: usize, context: &[String], eof: bool) -> Self {
        let context = context.join("\n");
        if eof {
            DiffError::InvalidEofContext { index, context }
        } else {
            DiffError::InvalidContext { index, context }
        }
    }
}

/// Orchestrator failures
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("path is a directory, not a file: {0}")]
    NotAFile(String),

    #[error("file already exists and cannot be added: {0}")]
    AlreadyExists(String),

    #[error("failed to parse patch: {0}")]
    Parse(#[from] DiffError),

    #[error(
        "patch contains fuzzy matches (fuzz level: {fuzz}, limit: {threshold}). Please make your context lines more precise"
    )]
    Fuzzy { fuzz: usize, threshold: usize },

    #[error("permission denied for {} file: {path}", .action.verb())]
    PermissionDenied { action: PermissionAction, path: String },

    /// Fatal: the filesystem refused an operation
    #[error("failed to {op} {}: {source}{}", .path.display(), changed_suffix(.changed))]
    Io {
        op: &'static str,
        path: PathBuf,
        changed: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    /// Fatal: a per-path advisory lock could not be taken
    #[error("failed to lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Fatal errors abort the caller; the rest are reported back as text.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Io { .. } | ToolError::Lock { .. })
    }

    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io { op, path: path.into(), changed: Vec::new(), source }
    }
}

fn changed_suffix(changed: &[String]) -> String {
    if changed.is_empty() {
        String::new()
    } else {
        format!(" (already changed: {})", changed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_errors_name_action_reason_and_path() {
        let err = DiffError::DuplicatePath { action: "Update", path: "/a.txt".into() };
        assert_eq!(err.to_string(), "Update File Error: Duplicate Path: /a.txt");

        let err = DiffError::MissingFile { action: "Delete", path: "/gone.txt".into() };
        assert_eq!(err.to_string(), "Delete File Error: Missing File: /gone.txt");
    }

    #[test]
    fn context_error_picks_eof_variant() {
        let ctx = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(DiffError::context(4, &ctx, true), DiffError::InvalidEofContext { index: 4, .. }));
        assert_eq!(DiffError::context(0, &ctx, false).to_string(), "Invalid Context at index 0:\na\nb");
    }

    #[test]
    fn io_errors_report_already_changed_paths() {
        let err = ToolError::Io {
            op: "write",
            path: PathBuf::from("/x/b.txt"),
            changed: vec!["/x/a.txt".into()],
            source: std::io::Error::other("disk full"),
        };
        assert!(err.is_fatal());
        let msg = err.to_string();
        assert!(msg.contains("failed to write /x/b.txt"));
        assert!(msg.contains("already changed: /x/a.txt"));
    }
}
