//! Patch and commit data model
//!
//! A `Patch` is the parsed form of one patch text: path → action, kept in
//! directive order. A `Commit` is the fully resolved set of before/after
//! contents derived from a patch that parsed without errors.

use indexmap::IndexMap;
use serde::Serialize;

/// Per-file operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Add,
    Delete,
    Update,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Add => "add",
            ActionType::Delete => "delete",
            ActionType::Update => "update",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Offset-anchored deletion/insertion pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub orig_index: usize,      // 0-based line in the original file
    pub del_lines: Vec<String>, // lines removed starting at orig_index
    pub ins_lines: Vec<String>, // lines inserted in their place
}

/// One directive's worth of parsed intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchAction {
    pub kind: ActionType,
    pub new_file: Option<String>, // Add only
    pub chunks: Vec<Chunk>,       // Update only, file order
    pub move_path: Option<String>,
}

impl PatchAction {
    pub fn add(content: String) -> Self {
        Self { kind: ActionType::Add, new_file: Some(content), chunks: Vec::new(), move_path: None }
    }

    pub fn delete() -> Self {
        Self { kind: ActionType::Delete, new_file: None, chunks: Vec::new(), move_path: None }
    }

    pub fn update(chunks: Vec<Chunk>, move_path: Option<String>) -> Self {
        Self { kind: ActionType::Update, new_file: None, chunks, move_path }
    }
}

/// Parsed patch: path → action in directive order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub actions: IndexMap<String, PatchAction>,
}

/// Resolved before/after content for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub kind: ActionType,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub move_path: Option<String>,
}

/// Fully resolved change set, ready for authorization and writing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub changes: IndexMap<String, FileChange>,
}

impl Commit {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
