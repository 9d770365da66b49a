use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::core::locate::SearchMode;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,               // global --quiet
    pub no_color: bool,            // global --no-color
    pub dry_run: bool,             // global --dry-run
    pub timeout_secs: Option<u64>, // global --timeout
}

#[derive(Parser)]
#[command(name = "tracegraph")]
#[command(
    about = "Attribute pattern occurrences to their enclosing functions \
             and expand them into a call graph"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Time limit per external tool invocation in seconds (0 = none)
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count pattern occurrences per file
    Inventory(InventoryArgs),

    /// Count pattern occurrences per (file, function)
    Index(IndexArgs),

    /// Write a call graph of the functions with the most occurrences
    Callgraph(CallgraphArgs),

    /// Initialize a tracegraph.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Search options shared by `index` and `callgraph`
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Pattern to look for, case-insensitive (default from config: "trace")
    pub pattern: Option<String>,

    /// Root of the source tree (default: config root or current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Treat the pattern as a regular expression instead of a plain substring
    #[arg(long)]
    pub regex: bool,
}

impl SearchArgs {
    pub fn mode(&self) -> SearchMode {
        if self.regex {
            SearchMode::Regex
        } else {
            SearchMode::Literal
        }
    }
}

#[derive(Parser, Debug)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub search: SearchArgs,
}

#[derive(Parser, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Order rows by descending count instead of by file and function
    #[arg(long)]
    pub by_count: bool,
}

#[derive(Parser, Debug)]
pub struct CallgraphArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Number of top (file, function) pairs to analyse
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output DOT file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory to write the script into (required without --stdout)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
