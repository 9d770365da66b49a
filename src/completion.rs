//! Shell completion scripts for the `tracegraph` binary.

use std::{fs, io};

use anyhow::{Context, Result, anyhow};
use clap::CommandFactory;
use clap_complete::{generate, generate_to};

use crate::cli::{AppContext, Cli, CompletionsArgs};

const BIN_NAME: &str = "tracegraph";

/// Print the script for `args.shell`, or write it under `--out-dir`.
pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let mut cmd = Cli::command();

    if args.stdout {
        generate(args.shell, &mut cmd, BIN_NAME, &mut io::stdout());
        return Ok(());
    }

    let dir = args
        .out_dir
        .ok_or_else(|| anyhow!("--out-dir is required unless --stdout is set"))?;

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = generate_to(args.shell, &mut cmd, BIN_NAME, &dir)
        .context("Failed to write completion script")?;

    if !ctx.quiet {
        println!("Wrote {} completions to {}", args.shell, path.display());
    }
    Ok(())
}
