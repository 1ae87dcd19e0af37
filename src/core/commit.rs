//! Commit builder
//!
//! Materializes final file contents from a parsed patch and the snapshots it
//! was parsed against. Nothing here touches the filesystem; relocating moved
//! files is left to the caller.

use crate::core::{
    error::DiffError,
    parser::Snapshots,
    types::{ActionType, Chunk, Commit, FileChange, Patch},
};

/// Resolve every action of `patch` into a [`FileChange`].
pub fn patch_to_commit(patch: &Patch, snapshots: &Snapshots) -> Result<Commit, DiffError> {
    let mut commit = Commit::default();

    for (path, action) in &patch.actions {
        let change = match action.kind {
            ActionType::Add => FileChange {
                kind: ActionType::Add,
                old_content: None,
                new_content: Some(action.new_file.clone().unwrap_or_default()),
                move_path: action.move_path.clone(),
            },
            ActionType::Delete => {
                let old = snapshots
                    .get(path)
                    .ok_or_else(|| DiffError::MissingFile { action: "Delete", path: path.clone() })?;
                FileChange {
                    kind: ActionType::Delete,
                    old_content: Some(old.clone()),
                    new_content: None,
                    move_path: action.move_path.clone(),
                }
            }
            ActionType::Update => {
                let old = snapshots
                    .get(path)
                    .ok_or_else(|| DiffError::MissingSnapshot { path: path.clone() })?;
                let new = apply_chunks(path, old, &action.chunks)?;
                FileChange {
                    kind: ActionType::Update,
                    old_content: Some(old.clone()),
                    new_content: Some(new),
                    move_path: action.move_path.clone(),
                }
            }
        };
        commit.changes.insert(path.clone(), change);
    }

    Ok(commit)
}

/// Splice `chunks` into `content`, last chunk first so earlier indices
/// stay valid. Chunks must be in file order and must not overlap.
pub fn apply_chunks(path: &str, content: &str, chunks: &[Chunk]) -> Result<String, DiffError> {
    let mut lines: Vec<&str> = content.split('\n').collect();

    // Validate against the original line count before splicing
    let mut limit = lines.len();
    for chunk in chunks.iter().rev() {
        let end = chunk.orig_index + chunk.del_lines.len();
        if end > limit {
            return Err(DiffError::ChunkOutOfRange { path: path.to_string(), index: chunk.orig_index });
        }
        limit = chunk.orig_index;
    }

    for chunk in chunks.iter().rev() {
        let start = chunk.orig_index;
        let end = start + chunk.del_lines.len();
        lines.splice(start..end, chunk.ins_lines.iter().map(String::as_str));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PatchAction;

    fn chunk(orig_index: usize, del: &[&str], ins: &[&str]) -> Chunk {
        Chunk {
            orig_index,
            del_lines: del.iter().map(|s| s.to_string()).collect(),
            ins_lines: ins.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn update_keeps_old_and_builds_new() {
        let mut patch = Patch::default();
        patch
            .actions
            .insert("/test.txt".into(), PatchAction::update(vec![chunk(1, &["old"], &["new"])], None));
        let snapshots: Snapshots = [("/test.txt".to_string(), "line1\nold\nline3\n".to_string())].into();

        let commit = patch_to_commit(&patch, &snapshots).unwrap();
        let change = &commit.changes["/test.txt"];

        assert_eq!(change.kind, ActionType::Update);
        assert_eq!(change.old_content.as_deref(), Some("line1\nold\nline3\n"));
        assert_eq!(change.new_content.as_deref(), Some("line1\nnew\nline3\n"));
    }

    #[test]
    fn add_and_delete_populate_one_side() {
        let mut patch = Patch::default();
        patch.actions.insert("/n.txt".into(), PatchAction::add("a\nb".into()));
        patch.actions.insert("/d.txt".into(), PatchAction::delete());
        let snapshots: Snapshots = [("/d.txt".to_string(), "bye\n".to_string())].into();

        let commit = patch_to_commit(&patch, &snapshots).unwrap();

        let add = &commit.changes["/n.txt"];
        assert_eq!((add.old_content.as_deref(), add.new_content.as_deref()), (None, Some("a\nb")));

        let del = &commit.changes["/d.txt"];
        assert_eq!((del.old_content.as_deref(), del.new_content.as_deref()), (Some("bye\n"), None));
    }

    #[test]
    fn update_without_snapshot_is_an_error() {
        let mut patch = Patch::default();
        patch.actions.insert("/ghost".into(), PatchAction::update(Vec::new(), None));
        assert_eq!(
            patch_to_commit(&patch, &Snapshots::new()).unwrap_err(),
            DiffError::MissingSnapshot { path: "/ghost".into() }
        );
    }

    #[test]
    fn chunks_apply_in_reverse_order() {
        let content = "line1\nline2\nline3\nline4\nline5\n";
        let chunks = [chunk(0, &[], &["top"]), chunk(1, &["line2"], &["two", "2"]), chunk(4, &["line5"], &[])];

        let out = apply_chunks("f", content, &chunks).unwrap();
        assert_eq!(out, "top\nline1\ntwo\n2\nline3\nline4\n");
    }

    #[test]
    fn rejects_out_of_range_and_overlapping_chunks() {
        let content = "a\nb\n";
        assert!(matches!(
            apply_chunks("f", content, &[chunk(2, &["x", "y"], &[])]),
            Err(DiffError::ChunkOutOfRange { index: 2, .. })
        ));
        assert!(matches!(
            apply_chunks("f", content, &[chunk(0, &["a", "b"], &[]), chunk(1, &["b"], &[])]),
            Err(DiffError::ChunkOutOfRange { index: 0, .. })
        ));
    }
}
