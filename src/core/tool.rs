//! Patch tool orchestrator
//!
//! Drives one patch invocation through
//! `Discovering → Loading → Parsing → Committing → Authorizing → Applying → Done`.
//! Everything before `Applying` is free of side effects, and every path is
//! authorized before the first write. There is no rollback: an I/O failure
//! while applying reports which paths were already changed.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::{
    core::{
        commit::patch_to_commit,
        error::ToolError,
        parser::{Snapshots, identify_files_added, identify_files_needed, identify_moves, text_to_patch},
        permission::{PermissionAction, PermissionRequest, PermissionService},
        preview::generate_diff,
        types::{ActionType, Commit, FileChange, Patch},
    },
    infra::{
        io::{Filesystem, PathKind, resolve_path},
        lock::PathLocks,
    },
};

pub const TOOL_NAME: &str = "patch";

/// Cumulative fuzz above which a patch is refused
pub const DEFAULT_FUZZ_THRESHOLD: usize = 3;

const TOOL_DESCRIPTION: &str = r#"Applies a patch to multiple files in one operation.

The patch text must follow this format:
*** Begin Patch
*** Update File: /path/to/file
@@ Context line (unique within the file)
 Line to keep
-Line to remove
+Line to add
 Line to keep
*** Add File: /path/to/new/file
+Content of the new file
+More content
*** Delete File: /path/to/file/to/delete
*** End Patch

Requirements:
1. Context lines must uniquely identify the section being changed.
2. Whitespace and indentation must match the file exactly; fuzzy matches are rejected.
3. A second hunk in the same file needs its own @@ line.
4. Prefer absolute paths; relative paths resolve against the working directory.

Every change is authorized before any file is written."#;

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage
{
    Discovering,
    Loading,
    Parsing,
    Committing,
    Authorizing,
    Applying,
    Done,
}

/// Construction-time settings
#[derive(Debug, Clone)]
pub struct ToolOptions
{
    /// Base for relative patch paths
    pub root: PathBuf,
    pub fuzz_threshold: usize,
    /// Per-path write locks; `None` disables locking
    pub lock_dir: Option<PathBuf>,
}

impl ToolOptions
{
    pub fn new(root: impl Into<PathBuf>) -> Self
    {
        Self { root: root.into(), fuzz_threshold: DEFAULT_FUZZ_THRESHOLD, lock_dir: None }
    }
}

/// Tool-call parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PatchParams
{
    pub patch_text: String,
}

/// JSON block appended to a successful response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchResponseMetadata
{
    pub files_changed: Vec<String>,
    pub additions: usize,
    pub removals: usize,
}

/// Description advertised to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo
{
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub required: Vec<String>,
}

/// Text result handed back to the tool-call layer
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse
{
    pub content: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PatchResponseMetadata>,
}

impl ToolResponse
{
    pub fn error(message: impl Into<String>) -> Self
    {
        Self { content: message.into(), is_error: true, metadata: None }
    }
}

/// Parsed and resolved patch, not yet authorized
#[derive(Debug, Clone)]
pub struct PreparedPatch
{
    pub patch: Patch,
    pub commit: Commit,
    pub fuzz: usize,
}

/// Aggregate result of a completed invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome
{
    pub files_changed: Vec<String>,
    pub additions: usize,
    pub removals: usize,
}

impl PatchOutcome
{
    pub fn metadata(&self) -> PatchResponseMetadata
    {
        PatchResponseMetadata {
            files_changed: self
                .files_changed
                .clone(),
            additions: self.additions,
            removals: self.removals,
        }
    }

    pub fn summary(&self) -> String
    {
        format!(
            "Successfully applied patch to {} files\nAdditions: {}, Removals: {}\nFiles changed: [{}]",
            self.files_changed
                .len(),
            self.additions,
            self.removals,
            self.files_changed
                .join(", ")
        )
    }

    pub fn into_response(self) -> ToolResponse
    {
        let metadata = self.metadata();
        // serializing plain strings and integers cannot fail
        let json = serde_json::to_string(&metadata).unwrap_or_default();
        ToolResponse {
            content: format!("{}\n\nMetadata: {}", self.summary(), json),
            is_error: false,
            metadata: Some(metadata),
        }
    }
}

/// Multi-file patch tool with injected filesystem and permission service
pub struct PatchTool
{
    fs: Arc<dyn Filesystem>,
    permissions: Arc<dyn PermissionService>,
    options: ToolOptions,
}

impl PatchTool
{
    pub fn new(
        fs: Arc<dyn Filesystem>,
        permissions: Arc<dyn PermissionService>,
        options: ToolOptions,
    ) -> Self
    {
        Self { fs, permissions, options }
    }

    pub fn options(&self) -> &ToolOptions
    {
        &self.options
    }

    pub fn info(&self) -> ToolInfo
    {
        ToolInfo {
            name: TOOL_NAME.to_string(),
            description: TOOL_DESCRIPTION.to_string(),
            parameters: json!({
                "patch_text": {
                    "type": "string",
                    "description": "The full patch text that describes all changes to be made",
                }
            }),
            required: vec!["patch_text".to_string()],
        }
    }

    /// Tool-call entry point. Validation failures come back as error
    /// responses; only fatal I/O errors are returned as `Err`.
    pub fn run(
        &self,
        input: &str,
    ) -> Result<ToolResponse, ToolError>
    {
        let params: PatchParams = match serde_json::from_str(input)
        {
            Ok(params) => params,
            Err(e) => return Ok(ToolResponse::error(ToolError::InvalidParams(e.to_string()).to_string())),
        };
        if params
            .patch_text
            .is_empty()
        {
            return Ok(ToolResponse::error("patch_text is required"));
        }

        match self.execute(&params.patch_text)
        {
            Ok(outcome) => Ok(outcome.into_response()),
            Err(e) if !e.is_fatal() => Ok(ToolResponse::error(e.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Run the full state machine over `patch_text`.
    #[instrument(skip_all, fields(root = %self.options.root.display()))]
    pub fn execute(
        &self,
        patch_text: &str,
    ) -> Result<PatchOutcome, ToolError>
    {
        let mut stage = Stage::Discovering;
        let result = self.execute_stages(patch_text, &mut stage);
        match &result
        {
            Ok(outcome) => info!(
                files = outcome
                    .files_changed
                    .len(),
                additions = outcome.additions,
                removals = outcome.removals,
                "patch applied"
            ),
            Err(e) => warn!(?stage, error = %e, "patch failed"),
        }
        result
    }

    /// Discovering through Committing; touches nothing.
    pub fn prepare(
        &self,
        patch_text: &str,
    ) -> Result<PreparedPatch, ToolError>
    {
        let mut stage = Stage::Discovering;
        self.prepare_stages(patch_text, &mut stage)
    }

    fn execute_stages(
        &self,
        patch_text: &str,
        stage: &mut Stage,
    ) -> Result<PatchOutcome, ToolError>
    {
        let prepared = self.prepare_stages(patch_text, stage)?;

        enter(stage, Stage::Authorizing);
        self.authorize(&prepared.commit)?;

        enter(stage, Stage::Applying);
        let outcome = self.apply(&prepared.commit)?;

        enter(stage, Stage::Done);
        Ok(outcome)
    }

    fn prepare_stages(
        &self,
        patch_text: &str,
        stage: &mut Stage,
    ) -> Result<PreparedPatch, ToolError>
    {
        enter(stage, Stage::Discovering);
        let needed = self.discover(patch_text)?;

        enter(stage, Stage::Loading);
        let snapshots = self.load(&needed)?;

        enter(stage, Stage::Parsing);
        let (patch, fuzz) = text_to_patch(patch_text, &snapshots)?;
        if fuzz > self.options.fuzz_threshold
        {
            return Err(ToolError::Fuzzy { fuzz, threshold: self.options.fuzz_threshold });
        }

        enter(stage, Stage::Committing);
        let commit = patch_to_commit(&patch, &snapshots)?;

        Ok(PreparedPatch { patch, commit, fuzz })
    }

    fn resolve(
        &self,
        path: &str,
    ) -> PathBuf
    {
        resolve_path(&self.options.root, path)
    }

    fn stat(
        &self,
        path: &Path,
    ) -> Result<PathKind, ToolError>
    {
        self.fs
            .stat(path)
            .map_err(|e| ToolError::io("stat", path, e))
    }

    /// Check the textual directive scan against the filesystem; returns the
    /// paths that must be loaded.
    fn discover(
        &self,
        patch_text: &str,
    ) -> Result<Vec<String>, ToolError>
    {
        let needed = identify_files_needed(patch_text);
        for path in &needed
        {
            let abs = self.resolve(path);
            match self.stat(&abs)?
            {
                PathKind::File => {}
                PathKind::Missing => return Err(ToolError::FileNotFound(path.clone())),
                PathKind::Dir => return Err(ToolError::NotAFile(abs.display().to_string())),
            }
        }

        for path in identify_files_added(patch_text)
        {
            let abs = self.resolve(&path);
            if self.stat(&abs)? != PathKind::Missing
            {
                return Err(ToolError::AlreadyExists(abs.display().to_string()));
            }
        }

        for (source, dest) in identify_moves(patch_text)
        {
            if dest == source
            {
                continue;
            }
            let abs = self.resolve(&dest);
            if self.stat(&abs)? != PathKind::Missing
            {
                return Err(ToolError::AlreadyExists(abs.display().to_string()));
            }
        }

        debug!(needed = needed.len(), "discovered patch targets");
        Ok(needed)
    }

    fn load(
        &self,
        needed: &[String],
    ) -> Result<Snapshots, ToolError>
    {
        let mut snapshots = Snapshots::with_capacity(needed.len());
        for path in needed
        {
            let abs = self.resolve(path);
            let content = self
                .fs
                .read(&abs)
                .map_err(|e| ToolError::io("read", &abs, e))?;
            snapshots.insert(path.clone(), content);
        }
        Ok(snapshots)
    }

    /// One decision per changed path; the first denial aborts.
    fn authorize(
        &self,
        commit: &Commit,
    ) -> Result<(), ToolError>
    {
        for (path, change) in &commit.changes
        {
            let request = permission_request(path, change);
            let granted = self
                .permissions
                .request(&request);
            debug!(path = %path, action = request.action.as_str(), granted, "permission decision");
            if !granted
            {
                return Err(ToolError::PermissionDenied { action: request.action, path: path.clone() });
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        commit: &Commit,
    ) -> Result<PatchOutcome, ToolError>
    {
        let Some(lock_dir) = &self
            .options
            .lock_dir
        else
        {
            return self.write_changes(commit);
        };

        let mut targets = Vec::with_capacity(commit.len());
        for (path, change) in &commit.changes
        {
            targets.push(self.resolve(path));
            if let Some(dest) = &change.move_path
            {
                targets.push(self.resolve(dest));
            }
        }

        PathLocks::new(lock_dir)
            .with_locked(&targets, || self.write_changes(commit))
            .map_err(|(path, source)| ToolError::Lock { path, source })?
    }

    fn write_changes(
        &self,
        commit: &Commit,
    ) -> Result<PatchOutcome, ToolError>
    {
        let mut outcome = PatchOutcome::default();

        for (path, change) in &commit.changes
        {
            let move_to = change
                .move_path
                .as_ref()
                .filter(|dest| *dest != path);
            let abs = self.resolve(path);
            let old = change
                .old_content
                .as_deref()
                .unwrap_or_default();
            let new = change
                .new_content
                .as_deref()
                .unwrap_or_default();

            let written = match change.kind
            {
                ActionType::Add => self.create(&abs, new),
                ActionType::Delete => self
                    .fs
                    .remove(&abs)
                    .map_err(|e| ("delete", abs.clone(), e)),
                ActionType::Update => match move_to
                {
                    Some(dest) => self
                        .create(&self.resolve(dest), new)
                        .and_then(|()| {
                            self.fs
                                .remove(&abs)
                                .map_err(|e| {
                                    // destination already written
                                    outcome
                                        .files_changed
                                        .push(dest.clone());
                                    ("delete", abs.clone(), e)
                                })
                        }),
                    None => self
                        .fs
                        .write(&abs, new)
                        .map_err(|e| ("write", abs.clone(), e)),
                },
            };

            if let Err((op, failed, source)) = written
            {
                return Err(ToolError::Io {
                    op,
                    path: failed,
                    changed: outcome.files_changed,
                    source,
                });
            }

            outcome
                .files_changed
                .push(path.clone());
            if let Some(dest) = move_to
            {
                outcome
                    .files_changed
                    .push(dest.clone());
            }

            let preview = generate_diff(old, new, path);
            outcome.additions += preview.additions;
            outcome.removals += preview.removals;
        }

        Ok(outcome)
    }

    /// Write `content` to `abs`, creating parent directories first
    fn create(
        &self,
        abs: &Path,
        content: &str,
    ) -> Result<(), (&'static str, PathBuf, std::io::Error)>
    {
        if let Some(parent) = abs
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            self.fs
                .mkdir_all(parent)
                .map_err(|e| ("create directories for", parent.to_path_buf(), e))?;
        }
        self.fs
            .write(abs, content)
            .map_err(|e| ("write", abs.to_path_buf(), e))
    }
}

fn enter(
    stage: &mut Stage,
    next: Stage,
)
{
    *stage = next;
    debug!(stage = ?next, "patch stage");
}

/// Build the grant request and preview for one change
fn permission_request(
    path: &str,
    change: &FileChange,
) -> PermissionRequest
{
    let old = change
        .old_content
        .as_deref()
        .unwrap_or_default();
    let new = change
        .new_content
        .as_deref()
        .unwrap_or_default();

    let (action, description) = match change.kind
    {
        ActionType::Add => (PermissionAction::Create, format!("create file {path}")),
        ActionType::Delete => (PermissionAction::Delete, format!("delete file {path}")),
        ActionType::Update => match &change.move_path
        {
            Some(dest) if dest != path =>
            {
                (PermissionAction::Modify, format!("modify file {path} (move to {dest})"))
            }
            _ => (PermissionAction::Modify, format!("modify file {path}")),
        },
    };

    let dir = Path::new(path)
        .parent()
        .map(|p| p.display().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ".".to_string());

    PermissionRequest {
        tool_name: TOOL_NAME.to_string(),
        action,
        path: path.to_string(),
        dir,
        description,
        diff_preview: generate_diff(old, new, path).text,
    }
}
