use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: u8,    // global -v count
}

impl AppContext {
    /// Colors are on unless disabled by flag or `NO_COLOR`
    pub fn color(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none()
    }
}

#[derive(Parser)]
#[command(name = "pgate")]
#[command(about = "Apply multi-file LLM patches behind a per-file permission gate")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a patch, asking permission for every changed file
    Apply(ApplyArgs),

    /// Validate a patch against the current files without writing
    Check(CheckArgs),

    /// List the paths a patch reads, creates, or moves to
    Files(FilesArgs),

    /// Persist or show auto-approval of permission requests
    Automode(AutomodeArgs),

    /// Initialize a pgate.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Patch file to apply ("-" or omitted reads stdin)
    pub patch: Option<PathBuf>,

    /// Base directory for relative patch paths
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Grant every permission request without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Largest accepted cumulative fuzz (defaults to config)
    #[arg(long)]
    pub fuzz_threshold: Option<usize>,

    /// Output the tool response as JSON (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Patch file to check ("-" or omitted reads stdin)
    pub patch: Option<PathBuf>,

    /// Base directory for relative patch paths
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Largest accepted cumulative fuzz (defaults to config)
    #[arg(long)]
    pub fuzz_threshold: Option<usize>,

    /// Show a unified diff for every change
    #[arg(long)]
    pub diff: bool,
}

#[derive(Parser, Debug)]
pub struct FilesArgs {
    /// Patch file to scan ("-" or omitted reads stdin)
    pub patch: Option<PathBuf>,

    /// Output JSON (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AutomodeArgs {
    #[arg(value_enum)]
    pub state: AutomodeState,

    /// Directory holding the config file
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AutomodeState {
    On,
    Off,
    Status,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Install the script into this directory instead of printing it
    #[arg(long, conflicts_with = "stdout")]
    pub out_dir: Option<PathBuf>,

    /// Print the script to stdout (the default without --out-dir)
    #[arg(long)]
    pub stdout: bool,
}
