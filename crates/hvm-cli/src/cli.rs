//! CLI argument parsing.

use clap::{Args, Parser, Subcommand};
use hvm_core::{EnvVars, Tool};
use std::path::PathBuf;

use crate::styles::STYLES;

/// hvm - Haskell toolchain version manager
#[derive(Parser, Debug)]
#[command(name = "hvm")]
#[command(author, version, about = "Install and switch between Haskell toolchain versions")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(styles = STYLES)]
#[command(after_help = "Use `hvm help <command>` for more information about a command.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all commands.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true, env = EnvVars::HVM_VERBOSE)]
    pub verbose: bool,

    /// Suppress status output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = EnvVars::HVM_NO_COLOR)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, global = true, env = EnvVars::HVM_CONFIG_FILE)]
    pub config_file: Option<PathBuf>,

    /// Base directory (overrides HVM_DIR and the config file)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,
}

fn parse_tool(s: &str) -> Result<Tool, String> {
    s.parse::<Tool>().map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List installed versions, marking the active ones
    List {
        /// Only this tool (ghc, cabal, hls, stack)
        #[arg(value_parser = parse_tool)]
        tool: Option<Tool>,
    },

    /// Make an installed version active
    Set {
        #[arg(value_parser = parse_tool)]
        tool: Tool,

        /// Version, optionally prefixed by a target triple
        #[arg(value_name = "VERSION")]
        tool_version: String,
    },

    /// Remove the active links of a tool
    Unset {
        #[arg(value_parser = parse_tool)]
        tool: Tool,

        /// Cross-compiler target triple
        #[arg(long)]
        target: Option<String>,
    },

    /// Install a version from a downloaded archive
    Install {
        #[arg(value_parser = parse_tool)]
        tool: Tool,

        #[arg(value_name = "VERSION")]
        tool_version: String,

        /// Archive to install from (.tar, .tar.gz, .tar.xz, .tar.bz2, .zip)
        #[arg(long)]
        archive: PathBuf,

        /// Make the version active after installing
        #[arg(long)]
        set: bool,

        /// Reinstall if already installed
        #[arg(long)]
        force: bool,

        /// Directory inside the archive, as `/`-separated patterns
        #[arg(long, value_name = "PATTERNS")]
        descend: Option<String>,

        /// Directory of patches to apply before installing
        #[arg(long, value_name = "DIR")]
        patches: Option<PathBuf>,
    },

    /// Remove an installed version and its links
    Rm {
        #[arg(value_parser = parse_tool)]
        tool: Tool,

        #[arg(value_name = "VERSION")]
        tool_version: String,
    },

    /// Look up a version in a release catalog
    Latest {
        #[arg(value_parser = parse_tool)]
        tool: Tool,

        /// JSON release catalog
        #[arg(long)]
        catalog: PathBuf,

        /// Pick by tag instead of `Latest` (e.g. recommended, prerelease)
        #[arg(long, conflicts_with = "major_minor")]
        tag: Option<String>,

        /// Pick the latest release of a series, e.g. 9.4
        #[arg(long, value_name = "X.Y")]
        major_minor: Option<String>,
    },

    /// Print where a version is installed
    Whereis {
        #[arg(value_parser = parse_tool)]
        tool: Tool,

        #[arg(value_name = "VERSION")]
        tool_version: String,
    },
}
