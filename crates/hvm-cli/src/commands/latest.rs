//! `hvm latest`: pick a version out of a release catalog.

use super::Context;
use hvm_core::{Error, Result, TargetVersion, Tool, Version};
use hvm_toolchain::{Catalog, Tag, installed::installed_versions, latest_installed_for_major_minor};
use std::path::Path;

pub fn run(
    ctx: &Context,
    tool: Tool,
    catalog: &Path,
    tag: Option<&str>,
    major_minor: Option<&str>,
) -> Result<i32> {
    let catalog = Catalog::from_file(catalog)?;

    let picked = match (tag, major_minor) {
        (_, Some(series)) => {
            let (major, minor) = parse_series(series)?;
            match catalog.latest_for_major_minor(tool, major, minor) {
                Some(v) => Some(TargetVersion::new(v.clone())),
                None => {
                    // Fall back to what is already installed.
                    let installed = installed_versions(&ctx.dirs, tool)?;
                    latest_installed_for_major_minor(&installed, major, minor, None)
                }
            }
        }
        (Some(tag), None) => {
            let tag: Tag = tag.parse()?;
            catalog.tagged_version(tool, &tag)
        }
        (None, None) => catalog.latest(tool),
    };

    let Some(tv) = picked else {
        ctx.output.warn(&format!("No matching {} version", tool));
        return Ok(1);
    };

    ctx.output.result(&tv.to_string());
    if tool == Tool::Ghc
        && let Some(base) = catalog.base_version(&tv.version)
    {
        ctx.output.verbose(&format!("base {}", base));
    }
    Ok(0)
}

/// Parse an `X.Y` series.
fn parse_series(text: &str) -> Result<(u64, u64)> {
    let err = || Error::parse("version series", text, "expected <major>.<minor>");
    let version: Version = text.parse().map_err(|_| err())?;
    match version.major_minor() {
        Some(mm) if text.split('.').count() == 2 => Ok(mm),
        _ => Err(err()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series() {
        assert_eq!(parse_series("9.4").unwrap(), (9, 4));
        assert!(parse_series("9").is_err());
        assert!(parse_series("9.4.8").is_err());
        assert!(parse_series("nine").is_err());
    }
}
