//! Command implementations.

mod install;
mod latest;
mod list;
mod switch;
mod whereis;

use crate::cli::{Cli, Commands, GlobalArgs};
use anyhow::Result;
use hvm_config::{Settings, load_settings};
use hvm_core::{ExitCode, TargetVersion};
use hvm_toolchain::Dirs;
use hvm_ui::{Output, Verbosity};

/// Everything a command needs: where things live, the settings, and where
/// to print.
pub struct Context {
    pub dirs: Dirs,
    pub settings: Settings,
    pub output: Output,
}

impl Context {
    fn from_global(global: &GlobalArgs, output: Output) -> hvm_core::Result<Self> {
        let settings = load_settings(global.config_file.as_deref())?;
        let dirs = match global.base_dir {
            Some(ref base) => Dirs::new(base),
            None => Dirs::from_settings(&settings)?,
        };
        tracing::debug!("Base directory: {}", dirs.base().display());
        Ok(Self {
            dirs,
            settings,
            output,
        })
    }
}

fn verbosity(global: &GlobalArgs) -> Verbosity {
    if global.verbose {
        Verbosity::Verbose
    } else if global.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    }
}

/// Parse a version argument, reporting a usage error on failure.
pub(crate) fn parse_version_arg(text: &str) -> hvm_core::Result<TargetVersion> {
    text.parse()
}

/// Print a failed command's error and pick its exit code.
fn report(result: hvm_core::Result<i32>, output: &Output) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            output.print_error(&e);
            ExitCode::for_error(&e).into()
        }
    }
}

/// Run the CLI command.
pub async fn run(cli: Cli) -> Result<i32> {
    if cli.global.no_color || !hvm_ui::style::colors_enabled() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let output = Output::with_verbosity(verbosity(&cli.global));

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(0);
    };

    let ctx = match Context::from_global(&cli.global, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => return Ok(report(Err(e), &output)),
    };

    let result = match command {
        Commands::List { tool } => list::run(&ctx, tool),
        Commands::Set { tool, tool_version } => switch::set(&ctx, tool, &tool_version),
        Commands::Unset { tool, target } => switch::unset(&ctx, tool, target.as_deref()),
        Commands::Install {
            tool,
            tool_version,
            archive,
            set,
            force,
            descend,
            patches,
        } => {
            let args = install::InstallArgs {
                tool,
                version: tool_version,
                archive,
                set,
                force,
                descend,
                patches,
            };
            install::install(&ctx, args).await
        }
        Commands::Rm { tool, tool_version } => install::remove(&ctx, tool, &tool_version),
        Commands::Latest {
            tool,
            catalog,
            tag,
            major_minor,
        } => latest::run(&ctx, tool, &catalog, tag.as_deref(), major_minor.as_deref()),
        Commands::Whereis { tool, tool_version } => whereis::run(&ctx, tool, &tool_version),
    };

    let code = report(result, &ctx.output);
    ctx.output.flush();
    Ok(code)
}
