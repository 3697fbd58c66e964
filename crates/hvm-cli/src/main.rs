//! hvm - Haskell toolchain version manager
//!
//! Installs GHC, cabal, HLS and stack side by side and switches between them.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod styles;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    hvm_telemetry::init(cli.global.verbose);

    let exit_code = commands::run(cli).await?;

    std::process::exit(exit_code);
}
