//! `hvm whereis`

use super::{Context, parse_version_arg};
use hvm_core::{Result, Tool};
use hvm_toolchain::installed::require_installation;

pub fn run(ctx: &Context, tool: Tool, version: &str) -> Result<i32> {
    let tv = parse_version_arg(version)?;
    let installation = require_installation(&ctx.dirs, tool, &tv)?;
    ctx.output.result(&installation.path().display().to_string());
    Ok(0)
}
