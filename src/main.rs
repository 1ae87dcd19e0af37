use anyhow::Result;
use clap::Parser;
use patchgate::{
    Config,
    cli::{AppContext, Cli, Commands},
    cli_ext::patch_cmd::{self, finish_with_exit},
    infra::{config, logging},
};

fn main() {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    finish_with_exit(run(cli.command, &ctx))
}

fn run(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Apply(args) => patch_cmd::apply_run(args, ctx, &configured(ctx)?),
        Commands::Check(args) => patch_cmd::check_run(args, ctx, &configured(ctx)?),
        Commands::Files(args) => {
            logging::init(ctx.verbose, "", ctx.color());
            patch_cmd::files_run(args, ctx)
        }
        Commands::Automode(args) => {
            logging::init(ctx.verbose, "", ctx.color());
            patch_cmd::automode_run(args, ctx)
        }
        Commands::Init(args) => config::init(args, ctx),
        Commands::Completions(args) => patchgate::completion::run(args, ctx),
    }
}

/// Load config from the working directory, then start logging with its level
fn configured(ctx: &AppContext) -> Result<Config> {
    let config = config::load_config()?;
    logging::init(ctx.verbose, &config.log.level, ctx.color());
    Ok(config)
}
