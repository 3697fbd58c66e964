//! `hvm set` and `hvm unset`.

use super::{Context, parse_version_arg};
use hvm_core::{Result, Tool};
use hvm_toolchain::{installed::require_installation, set_active, unset_active};
use hvm_ui::Style;

pub fn set(ctx: &Context, tool: Tool, version: &str) -> Result<i32> {
    let tv = parse_version_arg(version)?;
    require_installation(&ctx.dirs, tool, &tv)?;

    set_active(&ctx.dirs, tool, &tv)?;
    ctx.output
        .status("Activated", &Style::tool_version(tool, &tv));
    Ok(0)
}

pub fn unset(ctx: &Context, tool: Tool, target: Option<&str>) -> Result<i32> {
    match unset_active(&ctx.dirs, tool, target)? {
        Some(previous) => ctx
            .output
            .status("Unset", &Style::tool_version(tool, &previous)),
        None => ctx.output.info(&format!("No active {} version", tool)),
    }
    Ok(0)
}
