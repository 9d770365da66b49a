//! **tracegraph** - Attribute pattern occurrences to functions and expand them into a call graph
//!
//! ripgrep finds the matches, universal-ctags supplies function boundaries and
//! cscope answers "what does this function call". Everything external sits
//! behind [`ExternalServices`], so the pipeline runs against fixtures in tests.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - locate, resolve, attribute, fetch edges, assemble
pub mod core {
    /// Pattern search results grouped per file
    pub mod locate;
    pub use self::locate::{Hits, SearchMode, locate};

    /// Function spans inferred from tag start lines
    pub mod spans;
    pub use self::spans::{FunctionSpan, resolve};

    /// Per-file occurrence counts (`inventory` command)
    pub mod inventory;
    pub use self::inventory::{FileCounts, count_per_file, run as inventory_run};

    /// Match → enclosing function frequency table (`index` command)
    pub mod attribute;
    pub use self::attribute::{
        GLOBAL_SCOPE, OccurrenceKey, OccurrenceTable, attribute, run as index_run,
    };

    /// Reference database and callee rows
    pub mod xref;
    pub use self::xref::{CallEdge, CalleeColumn, ReferenceDb, edges_from};

    /// Deduplicated call graph (`callgraph` command)
    pub mod callgraph;
    pub use self::callgraph::{CallGraph, TopSelection, assemble, run as callgraph_run, select_top};
}

/// Infrastructure - configuration, external tools and helpers
pub mod infra {
    /// Configuration management with TOML support and env overrides
    pub mod config;
    pub use self::config::{Config, init as config_init, load_config};

    /// Typed external-tool failures
    pub mod error;
    pub use self::error::{ExternalToolError, Service};

    /// Child-process runner with time limits
    pub mod process;

    /// External service seam and its process-backed binding
    pub mod services;
    pub use self::services::{ExternalServices, ProcessServices, TagRecord};

    /// Root resolution, path labels, progress bars
    pub mod utils;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{callgraph_run, index_run, inventory_run};
pub use infra::{Config, ExternalServices, ExternalToolError, ProcessServices, load_config};

// Core types for external consumers
pub use crate::core::{CallEdge, CallGraph, FunctionSpan, Hits, OccurrenceKey, OccurrenceTable};
