use std::io;

use anyhow::Result;
use clap::Parser;
use tracegraph::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.no_color);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        timeout_secs: cli.timeout,
    };

    match cli.command {
        Commands::Inventory(args) => tracegraph::inventory_run(args, &ctx),
        Commands::Index(args) => tracegraph::index_run(args, &ctx),
        Commands::Callgraph(args) => tracegraph::callgraph_run(args, &ctx),
        Commands::Init(args) => tracegraph::infra::config::init(args, &ctx),
        Commands::Completions(args) => tracegraph::completion::run(args, &ctx),
    }
}

/// Logs go to stderr so stdout stays clean for the index table.
/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(io::stderr)
        .init();
}
