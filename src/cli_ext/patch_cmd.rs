//! CLI command handlers for applying and inspecting patches.
//!
//! Handlers return `anyhow::Result`; a rejected patch surfaces as a wrapped
//! [`ToolError`] so `main` can map it to exit code 2.

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::{
    cli::{AppContext, ApplyArgs, AutomodeArgs, AutomodeState, CheckArgs, FilesArgs},
    core::{
        error::ToolError,
        parser::{identify_files_added, identify_files_needed, identify_move_targets},
        permission::{AutoApprove, PermissionService, TerminalPrompt},
        preview::{generate_diff, unified_diff},
        tool::{PatchTool, PreparedPatch, ToolOptions, ToolResponse},
        types::ActionType,
    },
    infra::{
        config::{Config, load_config_from, set_automode},
        io::LocalFs,
    },
};

/// Exit status for a patch the tool refused
pub const EXIT_REJECTED: i32 = 2;

/// Exit status for I/O, lock, and usage failures
pub const EXIT_FATAL: i32 = 1;

/// Map a handler error to the process exit code
pub fn exit_code_for(err: &anyhow::Error) -> i32
{
    match err.downcast_ref::<ToolError>()
    {
        Some(e) if !e.is_fatal() => EXIT_REJECTED,
        _ => EXIT_FATAL,
    }
}

/// Print the error and exit with its mapped code
pub fn finish_with_exit(result: Result<()>) -> !
{
    match result
    {
        Ok(()) => std::process::exit(0),
        Err(e) =>
        {
            eprintln!("Error: {:#}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// Patch text from a file, or stdin for `-`/omitted
pub fn read_patch(path: Option<&Path>) -> Result<String>
{
    match path
    {
        Some(p) if p != Path::new("-") =>
        {
            fs::read_to_string(p).with_context(|| format!("Failed to read patch file {}", p.display()))
        }
        _ =>
        {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read patch from stdin")?;
            Ok(text)
        }
    }
}

fn reads_stdin(path: Option<&Path>) -> bool
{
    path.is_none_or(|p| p == Path::new("-"))
}

fn tool_for(
    root: PathBuf,
    fuzz_threshold: Option<usize>,
    permissions: Arc<dyn PermissionService>,
    config: &Config,
) -> PatchTool
{
    let options = ToolOptions {
        root,
        fuzz_threshold: fuzz_threshold.unwrap_or(config.fuzz_threshold),
        lock_dir: config
            .lock_dir
            .clone(),
    };
    PatchTool::new(Arc::new(LocalFs), permissions, options)
}

/// `pgate apply`
#[instrument(skip_all, fields(patch = ?args.patch))]
pub fn apply_run(
    args: ApplyArgs,
    ctx: &AppContext,
    config: &Config,
) -> Result<()>
{
    let text = read_patch(args.patch.as_deref())?;

    let auto = args.yes || config.automode;
    let permissions: Arc<dyn PermissionService> = if auto
    {
        Arc::new(AutoApprove)
    }
    else
    {
        if reads_stdin(args.patch.as_deref())
        {
            warn!("patch read from stdin; permission prompts will see end of input and deny");
        }
        Arc::new(TerminalPrompt::stdio(ctx.color()))
    };

    let tool = tool_for(args.root, args.fuzz_threshold, permissions, config);

    if ctx.dry_run
    {
        let prepared = tool.prepare(&text)?;
        if !ctx.quiet
        {
            println!("Dry run: no files written");
            print_plan(&prepared, ctx);
        }
        return Ok(());
    }

    match tool.execute(&text)
    {
        Ok(outcome) =>
        {
            if args.json
            {
                println!("{}", serde_json::to_string(&outcome.into_response())?);
            }
            else if !ctx.quiet
            {
                let summary = outcome.summary();
                if ctx.color()
                {
                    println!("{}", summary.green());
                }
                else
                {
                    println!("{}", summary);
                }
            }
            Ok(())
        }
        Err(e) =>
        {
            if args.json && !e.is_fatal()
            {
                println!("{}", serde_json::to_string(&ToolResponse::error(e.to_string()))?);
            }
            Err(e.into())
        }
    }
}

/// `pgate check`
#[instrument(skip_all, fields(patch = ?args.patch))]
pub fn check_run(
    args: CheckArgs,
    ctx: &AppContext,
    config: &Config,
) -> Result<()>
{
    let text = read_patch(args.patch.as_deref())?;
    // never reaches authorization
    let tool = tool_for(args.root, args.fuzz_threshold, Arc::new(AutoApprove), config);
    let prepared = tool.prepare(&text)?;

    if ctx.quiet
    {
        return Ok(());
    }

    print_plan(&prepared, ctx);

    if args.diff
    {
        for (path, change) in &prepared
            .commit
            .changes
        {
            let old = change
                .old_content
                .as_deref()
                .unwrap_or_default();
            let new = change
                .new_content
                .as_deref()
                .unwrap_or_default();
            let shown = change
                .move_path
                .as_deref()
                .unwrap_or(path);
            print_diff(&unified_diff(old, new, shown, config.preview.context_lines), ctx);
        }
    }
    Ok(())
}

fn print_plan(
    prepared: &PreparedPatch,
    ctx: &AppContext,
)
{
    for (path, change) in &prepared
        .commit
        .changes
    {
        let preview = generate_diff(
            change
                .old_content
                .as_deref()
                .unwrap_or_default(),
            change
                .new_content
                .as_deref()
                .unwrap_or_default(),
            path,
        );
        let target = match &change.move_path
        {
            Some(dest) if dest != path => format!("{path} -> {dest}"),
            _ => path.clone(),
        };
        let label = format!("{:<6}", change.kind.as_str());
        let counts = format!("+{} -{}", preview.additions, preview.removals);

        if ctx.color()
        {
            let label = match change.kind
            {
                ActionType::Add => label.green().to_string(),
                ActionType::Delete => label.red().to_string(),
                ActionType::Update => label.yellow().to_string(),
            };
            println!("{} {} ({})", label, target, counts.dimmed());
        }
        else
        {
            println!("{} {} ({})", label, target, counts);
        }
    }
    println!(
        "{} files, fuzz {}",
        prepared
            .commit
            .len(),
        prepared.fuzz
    );
}

fn print_diff(
    diff: &str,
    ctx: &AppContext,
)
{
    if !ctx.color()
    {
        print!("{}", diff);
        return;
    }
    for line in diff.lines()
    {
        if line.starts_with("+++") || line.starts_with("---")
        {
            println!("{}", line.bold());
        }
        else if line.starts_with('+')
        {
            println!("{}", line.green());
        }
        else if line.starts_with('-')
        {
            println!("{}", line.red());
        }
        else if line.starts_with("@@")
        {
            println!("{}", line.cyan());
        }
        else
        {
            println!("{}", line);
        }
    }
}

/// Paths a patch touches, from the textual directive scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesReport
{
    pub needed: Vec<String>,
    pub added: Vec<String>,
    pub moved_to: Vec<String>,
}

impl FilesReport
{
    pub fn scan(text: &str) -> Self
    {
        Self {
            needed: identify_files_needed(text),
            added: identify_files_added(text),
            moved_to: identify_move_targets(text),
        }
    }
}

/// `pgate files`
pub fn files_run(
    args: FilesArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let text = read_patch(args.patch.as_deref())?;
    let report = FilesReport::scan(&text);

    if args.json
    {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }
    if ctx.quiet
    {
        return Ok(());
    }

    for (heading, paths) in [("needed", &report.needed), ("added", &report.added), ("moved to", &report.moved_to)]
    {
        if paths.is_empty()
        {
            continue;
        }
        if ctx.color()
        {
            println!("{}:", heading.bold());
        }
        else
        {
            println!("{}:", heading);
        }
        for path in paths
        {
            println!("  {}", path);
        }
    }
    Ok(())
}

/// `pgate automode`
pub fn automode_run(
    args: AutomodeArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let enabled = match args.state
    {
        AutomodeState::Status =>
        {
            let config = load_config_from(&args.path)?;
            println!("automode: {}", if config.automode { "on" } else { "off" });
            return Ok(());
        }
        AutomodeState::On => true,
        AutomodeState::Off => false,
    };

    if ctx.dry_run
    {
        println!("Would turn automode {}", if enabled { "on" } else { "off" });
        return Ok(());
    }

    let path = set_automode(&args.path, enabled)?;
    if !ctx.quiet
    {
        println!("automode {} ({})", if enabled { "on" } else { "off" }, path.display());
    }
    Ok(())
}
