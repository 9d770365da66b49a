//! Filepath: src/core/callgraph.rs
//! Call graph assembler and the `callgraph` command.
//!
//! Nodes are function names, edges are `caller → callee`. Both are
//! deduplicated on insertion, so the graph only ever grows by new names and
//! new pairs.

use std::{
    collections::{BTreeSet, HashMap},
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use owo_colors::OwoColorize;
use petgraph::{
    dot::{Config, Dot},
    graph::{DiGraph, NodeIndex},
};
use tracing::{debug, info, instrument};

use crate::{
    cli::{AppContext, CallgraphArgs},
    core::{
        attribute::{OccurrenceTable, attribute_with_progress},
        locate::locate,
        xref::{CallEdge, CalleeColumn, ReferenceDb, edges_from},
    },
    infra::{
        config::load_config_or_default,
        error::ExternalToolError,
        services::{ExternalServices, ProcessServices},
        utils::{progress_bar, resolve_root},
    },
};

/// Edge weight; carries no data beyond "calls".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls;

impl fmt::Display for Calls
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "calls")
    }
}

/// Deduplicated directed call graph.
#[derive(Debug, Clone, Default)]
pub struct CallGraph
{
    graph: DiGraph<String, Calls>,
    index: HashMap<String, NodeIndex>,
}

impl CallGraph
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Insert `name` unless present; returns its node either way.
    pub fn add_node(
        &mut self,
        name: &str,
    ) -> NodeIndex
    {
        if let Some(&idx) = self
            .index
            .get(name)
        {
            return idx;
        }

        let idx = self
            .graph
            .add_node(name.to_string());
        self.index
            .insert(name.to_string(), idx);
        idx
    }

    /// Insert both endpoints and the pair; repeated pairs are ignored.
    pub fn add_edge(
        &mut self,
        edge: &CallEdge,
    )
    {
        let from = self.add_node(&edge.caller);
        let to = self.add_node(&edge.callee);
        self.graph
            .update_edge(from, to, Calls);
    }

    pub fn node_count(&self) -> usize
    {
        self.graph
            .node_count()
    }

    pub fn edge_count(&self) -> usize
    {
        self.graph
            .edge_count()
    }

    pub fn contains_node(
        &self,
        name: &str,
    ) -> bool
    {
        self.index
            .contains_key(name)
    }

    pub fn contains_edge(
        &self,
        caller: &str,
        callee: &str,
    ) -> bool
    {
        match (
            self.index
                .get(caller),
            self.index
                .get(callee),
        )
        {
            (Some(&a), Some(&b)) => self
                .graph
                .contains_edge(a, b),
            _ => false,
        }
    }

    /// Node names, sorted.
    pub fn nodes(&self) -> BTreeSet<&str>
    {
        self.graph
            .node_weights()
            .map(String::as_str)
            .collect()
    }

    /// Edge pairs `(caller, callee)`, sorted.
    pub fn edges(&self) -> BTreeSet<(&str, &str)>
    {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].as_str(), self.graph[b].as_str()))
            .collect()
    }

    /// Direct callees of `name`, sorted.
    pub fn callees(
        &self,
        name: &str,
    ) -> BTreeSet<&str>
    {
        match self
            .index
            .get(name)
        {
            Some(&idx) => self
                .graph
                .neighbors(idx)
                .map(|n| self.graph[n].as_str())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Graphviz rendering without edge labels.
    pub fn to_dot(&self) -> String
    {
        format!("{}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }
}

/// Functions to expand and the files their reference database must cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopSelection
{
    pub functions: Vec<String>,
    pub scope: BTreeSet<PathBuf>,
}

/// Take the `limit` most frequent `(file, function)` pairs, skipping file-scope
/// matches. Function names are deduplicated in rank order; the scope is
/// every file behind a selected pair, made absolute against `root`.
pub fn select_top(
    table: &OccurrenceTable,
    root: &Path,
    limit: usize,
) -> TopSelection
{
    let pairs: Vec<_> = table
        .by_frequency()
        .into_iter()
        .filter(|(key, _)| !key.is_global())
        .take(limit)
        .collect();

    let functions = pairs
        .iter()
        .map(|(key, _)| {
            key.function
                .clone()
        })
        .unique()
        .collect();

    let scope = pairs
        .iter()
        .map(|(key, _)| root.join(&key.file))
        .collect();

    TopSelection { functions, scope }
}

/// Build the reference database once and expand each function into its callees.
pub fn assemble<S>(
    services: &S,
    top_functions: &[String],
    scope: &BTreeSet<PathBuf>,
) -> Result<CallGraph, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    assemble_with(services, top_functions, scope, CalleeColumn::default())
}

/// [`assemble`] with an explicit row layout for the query service.
///
/// With nothing to expand no database is built and the graph is empty.
#[instrument(skip_all, fields(functions = top_functions.len(), files = scope.len()))]
pub fn assemble_with<S>(
    services: &S,
    top_functions: &[String],
    scope: &BTreeSet<PathBuf>,
    column: CalleeColumn,
) -> Result<CallGraph, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    let mut graph = CallGraph::new();

    if top_functions.is_empty()
    {
        return Ok(graph);
    }

    // One database for the whole run; dropped (and deleted) on return
    let db = ReferenceDb::build(services, scope, column)?;

    for function in top_functions
    {
        // Isolated nodes for functions that call nothing
        graph.add_node(function);

        for edge in edges_from(services, &db, function)?
        {
            graph.add_edge(&edge);
        }
    }

    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "assembled call graph");

    Ok(graph)
}

/// CLI entry point for `tracegraph callgraph`.
pub fn run(
    args: CallgraphArgs,
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
    let limit = args
        .limit
        .unwrap_or(config.callgraph.limit);
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| {
            config
                .callgraph
                .output
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
            let heading = "DRY RUN: Would build call graph:";
            if ctx.no_color
            {
                println!("{heading}");
            }
            else
            {
                println!("{}", heading.yellow());
            }
            println!("  Root: {}", root.display());
            println!("  Pattern: {pattern}");
            println!("  Functions: top {limit}");
            println!("  Cross-reference tool: {}", config.tools.xref);
            println!("  Output: {}", out.display());
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

    let progress = progress_bar(hits.len(), ctx);
    let table = attribute_with_progress(&services, &root, &hits, &progress)
        .context("Failed to attribute matches to functions")?;

    // Expand only the hottest functions
    let top = select_top(&table, &root, limit);
    info!(functions = top.functions.len(), files = top.scope.len(), "expanding top functions");

    let graph = assemble_with(&services, &top.functions, &top.scope, config.tools.callee_column)
        .context("Failed to assemble call graph")?;

    // DOT goes to disk, status to stdout
    fs::write(&out, graph.to_dot())
        .with_context(|| format!("Failed to write {}", out.display()))?;

    if !ctx.quiet
    {
        if ctx.no_color
        {
            println!("wrote {}", out.display());
        }
        else
        {
            println!("{} wrote {}", "✓".green(), out.display());
        }
    }

    Ok(())
}
