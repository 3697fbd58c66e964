//! `hvm list`: installed versions with the active ones marked.

use super::Context;
use hvm_core::{Result, TargetVersion, Tool};
use hvm_toolchain::{InstalledEntry, get_active_managed, is_source_built, list_installed};

pub fn run(ctx: &Context, tool: Option<Tool>) -> Result<i32> {
    let tools: Vec<Tool> = match tool {
        Some(t) => vec![t],
        None => Tool::ALL.to_vec(),
    };

    for tool in tools {
        list_tool(ctx, tool)?;
    }
    Ok(0)
}

fn list_tool(ctx: &Context, tool: Tool) -> Result<()> {
    let entries = list_installed(&ctx.dirs, tool)?;
    if entries.is_empty() {
        ctx.output.info(&format!("No {} versions installed", tool));
        return Ok(());
    }

    ctx.output.header(tool.name());

    // Cross compilers each have their own active version.
    let mut active: Vec<TargetVersion> = Vec::new();
    let mut targets: Vec<Option<&str>> = vec![None];
    for entry in &entries {
        if let Some(tv) = entry.version()
            && let Some(target) = tv.target.as_deref()
            && !targets.contains(&Some(target))
        {
            targets.push(Some(target));
        }
    }
    for target in targets {
        if let Some(tv) = get_active_managed(&ctx.dirs, tool, target)? {
            active.push(tv);
        }
    }

    for entry in &entries {
        match entry {
            InstalledEntry::Parsed(tv) => {
                let is_active = active.contains(tv);
                let note = (tool == Tool::Ghc && is_source_built(&ctx.dirs, tv)).then_some("compiled");
                ctx.output
                    .version_entry(&format!("{} {}", tool, tv), is_active, note);
            }
            InstalledEntry::Unparsed(name) => {
                ctx.output
                    .version_entry(&format!("{} {}", tool, name), false, Some("unrecognized"));
            }
        }
    }
    Ok(())
}
