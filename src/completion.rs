//! `pgate completions <shell>`: completion scripts via clap_complete.

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate, generate_to};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};

const BIN_NAME: &str = "pgate";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Print the script to stdout, or install it under `--out-dir`.
pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let shell = CompletionShell::from(args.shell);
    let mut cmd = Cli::command();

    let Some(dir) = args.out_dir.filter(|_| !args.stdout) else {
        generate(shell, &mut cmd, BIN_NAME, &mut std::io::stdout());
        return Ok(());
    };

    if ctx.dry_run {
        if !ctx.quiet {
            eprintln!("Dry run: {BIN_NAME} {shell} completions not written to {}", dir.display());
        }
        return Ok(());
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create completions directory {}", dir.display()))?;
    let path = generate_to(shell, &mut cmd, BIN_NAME, &dir)
        .with_context(|| format!("Failed to write {shell} completions for {BIN_NAME}"))?;

    if !ctx.quiet {
        eprintln!("Installed {shell} completions for {BIN_NAME}: {}", path.display());
    }
    Ok(())
}
