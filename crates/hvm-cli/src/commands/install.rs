//! `hvm install` and `hvm rm`.

use super::{Context, parse_version_arg};
use hvm_core::{Result, Tool};
use hvm_toolchain::{DescentSpec, InstallRequest, install_from_archive, remove_installation};
use hvm_ui::{Spinner, Style};
use std::path::PathBuf;
use std::time::Instant;

pub struct InstallArgs {
    pub tool: Tool,
    pub version: String,
    pub archive: PathBuf,
    pub set: bool,
    pub force: bool,
    pub descend: Option<String>,
    pub patches: Option<PathBuf>,
}

pub async fn install(ctx: &Context, args: InstallArgs) -> Result<i32> {
    let tv = parse_version_arg(&args.version)?;

    let mut request = InstallRequest::new(args.tool, tv.clone(), &args.archive)
        .activate(args.set)
        .force(args.force);
    if let Some(ref spec) = args.descend {
        request = request.with_descent(DescentSpec::parse_patterns(spec)?);
    }
    if let Some(ref dir) = args.patches {
        request = request.with_patches(dir);
    }

    let label = Style::tool_version(args.tool, &tv);
    ctx.output.verbose(&format!("Archive: {}", args.archive.display()));

    let start = Instant::now();
    let spinner = Spinner::new(format!("Installing {}", label));
    let outcome = match install_from_archive(&ctx.dirs, &ctx.settings, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_error(format!("Failed to install {}", label));
            return Err(e);
        }
    };

    if outcome.already_installed {
        spinner.finish_warning(format!("{} is already installed", label));
        ctx.output.info("Use --force to reinstall");
        return Ok(0);
    }

    spinner.finish_clear();
    ctx.output.status("Installed", &format!("{} to {}", label, Style::path(&outcome.location)));
    if outcome.activated {
        ctx.output.status("Activated", &label);
    }
    ctx.output.success_summary("Done", start.elapsed());
    Ok(0)
}

pub fn remove(ctx: &Context, tool: Tool, version: &str) -> Result<i32> {
    let tv = parse_version_arg(version)?;
    remove_installation(&ctx.dirs, tool, &tv)?;
    ctx.output.status("Removed", &Style::tool_version(tool, &tv));
    Ok(0)
}
