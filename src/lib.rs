//! **patchgate** - Multi-file patch application for LLM tool calls
//!
//! Parses the `*** Begin Patch` envelope format, resolves hunks against file
//! snapshots with bounded whitespace fuzz, and writes changes only after a
//! per-file permission grant.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Patch engine - parsing, context resolution, commit building, orchestration
pub mod core {
    /// Patch, chunk, and commit data types
    pub mod types;
    pub use types::{ActionType, Chunk, Commit, FileChange, Patch, PatchAction};

    /// Parse and tool error types
    pub mod error;
    pub use error::{DiffError, ToolError};

    /// Hunk body compilation into context and chunks
    pub mod hunk;

    /// Context search with graded whitespace strictness
    pub mod resolve;

    /// Patch text parser and directive scans
    pub mod parser;
    pub use parser::{Snapshots, identify_files_added, identify_files_needed, text_to_patch};

    /// Patch to commit conversion and chunk splicing
    pub mod commit;
    pub use commit::{apply_chunks, patch_to_commit};

    /// Approximate and unified diff previews
    pub mod preview;
    pub use preview::{DiffPreview, generate_diff};

    /// Permission service contract and implementations
    pub mod permission;
    pub use permission::{PermissionAction, PermissionRequest, PermissionService};

    /// Patch tool state machine
    pub mod tool;
    pub use tool::{PatchOutcome, PatchTool, ToolOptions, ToolResponse};
}

/// Infrastructure - Configuration, I/O, locking, and logging
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Filesystem collaborator with memory-mapped reads for large files (>1MB)
    pub mod io;
    pub use io::{Filesystem, LocalFs, PathKind};

    /// Per-path advisory write locks
    pub mod lock;
    pub use lock::PathLocks;

    /// tracing-subscriber setup
    pub mod logging;
}

/// Command handlers behind the CLI
pub mod cli_ext {
    /// apply / check / files / automode
    pub mod patch_cmd;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{DiffError, PatchTool, ToolError, ToolOptions};
pub use infra::{Config, load_config};
