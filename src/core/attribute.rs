//! Filepath: src/core/attribute.rs
//! Occurrence attributor and the `index` command.
//!
//! Each match is charged to the function whose span contains its line, or
//! to [`GLOBAL_SCOPE`] when it sits outside every function.

use std::{
    cmp::Reverse,
    collections::BTreeMap,
    path::Path,
};

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    cli::{AppContext, IndexArgs},
    core::{
        locate::{Hits, locate},
        spans::{containing_span, resolve},
    },
    infra::{
        config::load_config_or_default,
        error::ExternalToolError,
        services::{ExternalServices, ProcessServices},
        utils::{progress_bar, relative_label, resolve_root},
    },
};

/// Function name used for matches outside any function (file scope).
pub const GLOBAL_SCOPE: &str = "<global>";

/// `(file relative to root, function name)`; ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OccurrenceKey
{
    pub file: String,
    pub function: String,
}

impl OccurrenceKey
{
    pub fn new(
        file: impl Into<String>,
        function: impl Into<String>,
    ) -> Self
    {
        Self { file: file.into(), function: function.into() }
    }

    pub fn is_global(&self) -> bool
    {
        self.function == GLOBAL_SCOPE
    }
}

/// Frequency table of occurrences per `(file, function)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceTable
{
    counts: BTreeMap<OccurrenceKey, usize>,
}

impl OccurrenceTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Count one more occurrence for `key`.
    pub fn record(
        &mut self,
        key: OccurrenceKey,
    )
    {
        *self
            .counts
            .entry(key)
            .or_insert(0) += 1;
    }

    /// Occurrences recorded for `(file, function)`; zero when absent.
    pub fn count(
        &self,
        file: &str,
        function: &str,
    ) -> usize
    {
        self.counts
            .get(&OccurrenceKey::new(file, function))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct `(file, function)` pairs.
    pub fn len(&self) -> usize
    {
        self.counts
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.counts
            .is_empty()
    }

    /// Sum of all counts (= number of attributed matches).
    pub fn total(&self) -> usize
    {
        self.counts
            .values()
            .sum()
    }

    /// Entries in lexicographic `(file, function)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&OccurrenceKey, usize)>
    {
        self.counts
            .iter()
            .map(|(key, &count)| (key, count))
    }

    /// Entries by descending count; ties keep lexicographic order.
    pub fn by_frequency(&self) -> Vec<(&OccurrenceKey, usize)>
    {
        let mut entries: Vec<_> = self
            .iter()
            .collect();
        entries.sort_by_key(|&(_, count)| Reverse(count));
        entries
    }
}

/// Attribute every hit to its enclosing function.
pub fn attribute<S>(
    services: &S,
    root: &Path,
    hits: &Hits,
) -> Result<OccurrenceTable, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    attribute_with_progress(services, root, hits, &ProgressBar::hidden())
}

/// [`attribute`], ticking `progress` once per resolved file.
///
/// Spans are resolved once per file and dropped once its lines are charged.
#[instrument(skip_all, fields(root = %root.display(), files = hits.len()))]
pub fn attribute_with_progress<S>(
    services: &S,
    root: &Path,
    hits: &Hits,
    progress: &ProgressBar,
) -> Result<OccurrenceTable, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    let mut table = OccurrenceTable::new();

    for (file, lines) in hits
    {
        let label = relative_label(root, file);
        progress.set_message(label.clone());

        // Spans live only as long as this file's lines
        let spans = resolve(services, file)?;

        for &line in lines
        {
            let function = containing_span(&spans, line)
                .map(|span| {
                    span.name
                        .as_str()
                })
                .unwrap_or(GLOBAL_SCOPE);

            table.record(OccurrenceKey::new(label.clone(), function));
        }

        progress.inc(1);
    }

    progress.finish_and_clear();
    debug!(pairs = table.len(), matches = table.total(), "attributed matches");

    Ok(table)
}

/// CLI entry point for `tracegraph index`.
pub fn run(
    args: IndexArgs,
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
            print_plan(&root, &pattern, &config.tools.search, &config.tools.tags);
        }
        return Ok(());
    }

    // Search once, then resolve spans file by file
    let services = ProcessServices::from_config(&config.tools, ctx.timeout_secs)
        .with_search_mode(
            args.search
                .mode(),
        );

    let hits = locate(&services, &pattern, &root)
        .with_context(|| format!("Failed to search for '{pattern}' under {}", root.display()))?;

    let progress = progress_bar(hits.len(), ctx);
    let table = attribute_with_progress(&services, &root, &hits, &progress)
        .context("Failed to attribute matches to functions")?;

    // Lexicographic unless asked for the hottest pairs first
    let rows: Vec<(&OccurrenceKey, usize)> = if args.by_count
    {
        table.by_frequency()
    }
    else
    {
        table
            .iter()
            .collect()
    };

    for (key, count) in rows
    {
        println!("{}\t{}\t{}", key.file, key.function, count);
    }

    if !ctx.quiet
    {
        println!("\nTotal (file, function) pairs containing '{}': {}", pattern, table.len());
    }

    Ok(())
}

fn print_plan(
    root: &Path,
    pattern: &str,
    search: &str,
    tags: &str,
)
{
    println!("DRY RUN: Would index:");
    println!("  Root: {}", root.display());
    println!("  Pattern: {pattern}");
    println!("  Search tool: {search}");
    println!("  Tag tool: {tags}");
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn table(entries: &[(&str, &str, usize)]) -> OccurrenceTable
    {
        let mut t = OccurrenceTable::new();
        for &(file, function, n) in entries
        {
            for _ in 0..n
            {
                t.record(OccurrenceKey::new(file, function));
            }
        }
        t
    }

    #[test]
    fn iter_is_lexicographic()
    {
        let t = table(&[("b.c", "x", 1), ("a.c", "z", 1), ("a.c", "<global>", 2)]);

        let keys: Vec<(&str, &str)> = t
            .iter()
            .map(|(k, _)| (k.file.as_str(), k.function.as_str()))
            .collect();

        assert_eq!(keys, vec![("a.c", "<global>"), ("a.c", "z"), ("b.c", "x")]);
    }

    #[test]
    fn by_frequency_is_descending_and_stable_on_ties()
    {
        let t = table(&[
            ("c.c", "hot", 5),
            ("b.c", "tie_b", 2),
            ("a.c", "tie_a", 2),
            ("d.c", "cold", 1),
        ]);

        let order: Vec<&str> = t
            .by_frequency()
            .into_iter()
            .map(|(k, _)| k.function.as_str())
            .collect();

        assert_eq!(order, vec!["hot", "tie_a", "tie_b", "cold"]);
    }

    #[test]
    fn counts_accumulate_and_default_to_zero()
    {
        let t = table(&[("a.c", "foo", 3)]);

        assert_eq!(t.count("a.c", "foo"), 3);
        assert_eq!(t.count("a.c", "bar"), 0);
        assert_eq!(t.total(), 3);
        assert_eq!(t.len(), 1);
        assert!(!t.is_empty());
    }

    #[test]
    fn global_key_is_recognised()
    {
        assert!(OccurrenceKey::new("a.c", GLOBAL_SCOPE).is_global());
        assert!(!OccurrenceKey::new("a.c", "main").is_global());
    }
}
