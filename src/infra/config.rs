use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::{AppContext, InitArgs};

/// Config files looked up in the working directory, first hit wins
const CONFIG_FILES: [&str; 4] =
    ["tracegraph.toml", "tracegraph.yaml", "tracegraph.json", ".tracegraph.toml"];

/// Environment prefix; `TRACEGRAPH__TOOLS__SEARCH=/opt/bin/rg` sets `tools.search`
const ENV_PREFIX: &str = "TRACEGRAPH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Default search pattern
    pub pattern: String,

    /// Tree root to scan (defaults to the working directory)
    pub root: Option<PathBuf>,

    /// External tool settings
    pub tools: ToolsConfig,

    /// Default call graph settings
    pub callgraph: CallgraphConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig
{
    /// Search program (ripgrep-compatible)
    pub search: String,

    /// Tag program (universal-ctags-compatible, JSON output)
    pub tags: String,

    /// Cross-reference program (cscope-compatible)
    pub xref: String,

    /// Per-invocation time limit in seconds; 0 disables it
    pub timeout_secs: u64,

    /// Field of a cross-reference row holding the callee
    pub callee_column: CalleeColumn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallgraphConfig
{
    /// Number of top (file, function) pairs to expand
    pub limit: usize,

    /// DOT output path
    pub output: PathBuf,
}

/// Which field of a query row names the callee.
///
/// `cscope -L -2` prints `file callee line text...`; the historical rule
/// takes the last field, which is what the default keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalleeColumn
{
    #[default]
    Last,
    Second,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            pattern: "trace".to_string(),
            root: None,
            tools: ToolsConfig::default(),
            callgraph: CallgraphConfig::default(),
        }
    }
}

impl Default for ToolsConfig
{
    fn default() -> Self
    {
        Self {
            search: "rg".to_string(),
            tags: "ctags".to_string(),
            xref: "cscope".to_string(),
            timeout_secs: 300,
            callee_column: CalleeColumn::Last,
        }
    }
}

impl Default for CallgraphConfig
{
    fn default() -> Self
    {
        Self { limit: 10, output: PathBuf::from("trace_callgraph.dot") }
    }
}

impl ToolsConfig
{
    pub fn timeout(&self) -> Option<Duration>
    {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for path in &CONFIG_FILES
    {
        if Path::new(path).exists()
        {
            debug!(path, "loading config file");
            builder = builder.add_source(config::File::from(Path::new(path)));
            break;
        }
    }

    // Add environment variables with TRACEGRAPH__ prefix
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

/// [`load_config`], falling back to defaults (with a warning) when the
/// configuration cannot be read.
pub fn load_config_or_default() -> Config
{
    match load_config()
    {
        Ok(config) => config,
        Err(err) =>
        {
            warn!("using default configuration: {err:#}");
            Config::default()
        }
    }
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("tracegraph.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
