//! Filepath: src/infra/utils.rs
//! Small helpers shared by the command entry points:
//! root resolution, path labels and progress bars.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{cli::AppContext, infra::config::Config};

/// Resolve the tree root: CLI flag, then config, then the working directory.
/// `~` and `$VAR` are expanded and the result is canonicalized.
pub fn resolve_root(
    arg: Option<&Path>,
    config: &Config,
) -> Result<PathBuf>
{
    let raw = arg
        .map(Path::to_path_buf)
        .or_else(|| {
            config
                .root
                .clone()
        })
        .unwrap_or_else(|| PathBuf::from("."));

    let expanded = shellexpand::full(&raw.to_string_lossy())
        .map(|s| PathBuf::from(s.as_ref()))
        .with_context(|| format!("Failed to expand root path {}", raw.display()))?;

    dunce::canonicalize(&expanded)
        .with_context(|| format!("Root directory not found: {}", expanded.display()))
}

/// Display label of `file` relative to `root`; unchanged when outside it.
pub fn relative_label(
    root: &Path,
    file: &Path,
) -> String
{
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned()
}

/// Per-file progress bar, hidden under `--quiet`.
pub fn progress_bar(
    len: usize,
    ctx: &AppContext,
) -> ProgressBar
{
    if ctx.quiet
    {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("#>-"));
    pb
}
