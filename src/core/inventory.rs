//! Filepath: src/core/inventory.rs
//! Per-file occurrence counts and the `inventory` command.
//!
//! The lightweight sibling of `index`: no tags, no spans, just how often the
//! pattern shows up in each file.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::{
    cli::{AppContext, InventoryArgs},
    core::locate::{Hits, locate},
    infra::{
        config::load_config_or_default,
        services::ProcessServices,
        utils::{relative_label, resolve_root},
    },
};

/// File (relative to root) → number of occurrences, sorted by file.
pub type FileCounts = BTreeMap<String, usize>;

/// Count every occurrence per file, repeated lines included.
pub fn count_per_file(
    root: &Path,
    hits: &Hits,
) -> FileCounts
{
    let mut counts = FileCounts::new();

    for (file, lines) in hits
    {
        // Two spellings of one path collapse onto the same label
        *counts
            .entry(relative_label(root, file))
            .or_insert(0) += lines.len();
    }

    counts
}

/// CLI entry point for `tracegraph inventory`.
pub fn run(
    args: InventoryArgs,
    ctx: &AppContext,
) -> Result<()>
{
    // Flags win over config
    let config = load_config_or_default();
    let root = resolve_root(
        args.search
            .root
            .as_deref(),
        &config,
    )?;
    let pattern = args
        .search
        .pattern
        .clone()
        .unwrap_or_else(|| {
            config
                .pattern
                .clone()
        });

    if pattern.is_empty()
    {
        bail!("Search pattern must not be empty");
    }

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: Would count occurrences per file:");
            println!("  Root: {}", root.display());
            println!("  Pattern: {pattern}");
            println!("  Search tool: {}", config.tools.search);
        }
        return Ok(());
    }

    let services = ProcessServices::from_config(&config.tools, ctx.timeout_secs)
        .with_search_mode(
            args.search
                .mode(),
        );

    let hits = locate(&services, &pattern, &root)
        .with_context(|| format!("Failed to search for '{pattern}' under {}", root.display()))?;

    let counts = count_per_file(&root, &hits);
    debug!(files = counts.len(), "counted occurrences per file");

    for (file, count) in &counts
    {
        println!("{file}\t{count}");
    }

    if !ctx.quiet
    {
        println!("\nTotal files containing '{}': {}", pattern, counts.len());
    }

    Ok(())
}
