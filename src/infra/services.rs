//! Filepath: src/infra/services.rs
//! The seam between the pipeline and the external tools.
//!
//! [`ExternalServices`] has one method per collaborator. [`ProcessServices`]
//! binds it to real `rg` / `ctags` / `cscope` processes; tests bind it to
//! canned fixtures.

use std::{
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::infra::{
    config::ToolsConfig,
    error::{ExternalToolError, Service},
    process::run_tool,
};

/// File → line numbers of each occurrence, in search output order.
///
/// Repeated occurrences on one line are kept as separate entries.
pub type Hits = IndexMap<PathBuf, Vec<usize>>;

/// How the search service interprets the pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode
{
    /// Plain substring (rg --fixed-strings)
    #[default]
    Literal,
    /// Regular expression in the search tool's dialect
    Regex,
}

/// One tag record exactly as the tag service emitted it (an untyped field bag).
pub type TagRecord = Map<String, Value>;

/// Request/response contract of the external collaborators.
pub trait ExternalServices
{
    /// Occurrences of `pattern` (case-insensitive) under `root`.
    fn search(
        &self,
        pattern: &str,
        root: &Path,
    ) -> Result<Hits, ExternalToolError>;

    /// Tag records for a single file.
    fn tag(
        &self,
        file: &Path,
    ) -> Result<Vec<TagRecord>, ExternalToolError>;

    /// Build a reference database in `workdir` from the newline-separated
    /// file list at `manifest` (which lives inside `workdir`).
    fn build_database(
        &self,
        workdir: &Path,
        manifest: &Path,
    ) -> Result<(), ExternalToolError>;

    /// Raw output rows of a "functions called by `symbol`" query run in `workdir`.
    fn query_callees(
        &self,
        workdir: &Path,
        symbol: &str,
    ) -> Result<Vec<String>, ExternalToolError>;
}

/// Services backed by child processes.
#[derive(Debug, Clone)]
pub struct ProcessServices
{
    search_program: String,
    tags_program: String,
    xref_program: String,
    timeout: Option<Duration>,
    search_mode: SearchMode,
}

impl ProcessServices
{
    /// Program names and time limit from config; `timeout_override` (seconds,
    /// 0 = none) wins over the configured limit.
    pub fn from_config(
        tools: &ToolsConfig,
        timeout_override: Option<u64>,
    ) -> Self
    {
        let timeout = match timeout_override
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => tools.timeout(),
        };

        Self {
            search_program: tools
                .search
                .clone(),
            tags_program: tools
                .tags
                .clone(),
            xref_program: tools
                .xref
                .clone(),
            timeout,
            search_mode: SearchMode::default(),
        }
    }

    pub fn with_search_mode(
        mut self,
        mode: SearchMode,
    ) -> Self
    {
        self.search_mode = mode;
        self
    }

    pub fn timeout(&self) -> Option<Duration>
    {
        self.timeout
    }
}

impl ExternalServices for ProcessServices
{
    fn search(
        &self,
        pattern: &str,
        root: &Path,
    ) -> Result<Hits, ExternalToolError>
    {
        let mut cmd = Command::new(&self.search_program);
        cmd.args([
            "--no-heading",
            "--with-filename",
            "--line-number",
            "--ignore-case",
            "--only-matching",
            "--null",
            "--color",
            "never",
        ]);
        if self.search_mode == SearchMode::Literal
        {
            cmd.arg("--fixed-strings");
        }
        cmd.arg("--regexp")
            .arg(pattern)
            .arg(root);

        let out = run_tool(Service::Search, &mut cmd, self.timeout)?;

        // rg: 0 = matches, 1 = no matches, 2 = error
        match out
            .status
            .code()
        {
            Some(0) => Ok(parse_search_output(&out.stdout)),
            Some(1) => Ok(Hits::new()),
            _ => Err(out.into_failure(Service::Search)),
        }
    }

    fn tag(
        &self,
        file: &Path,
    ) -> Result<Vec<TagRecord>, ExternalToolError>
    {
        let mut cmd = Command::new(&self.tags_program);
        cmd.args(["--output-format=json", "--fields=+n", "-o", "-"])
            .arg(file);

        let out = run_tool(Service::Tag, &mut cmd, self.timeout)?.require_success(Service::Tag)?;

        Ok(parse_tag_output(&out.stdout))
    }

    fn build_database(
        &self,
        workdir: &Path,
        manifest: &Path,
    ) -> Result<(), ExternalToolError>
    {
        let mut cmd = Command::new(&self.xref_program);
        cmd.args(["-b", "-q", "-i"])
            .arg(manifest)
            .current_dir(workdir);

        run_tool(Service::DatabaseBuild, &mut cmd, self.timeout)?
            .require_success(Service::DatabaseBuild)?;

        Ok(())
    }

    fn query_callees(
        &self,
        workdir: &Path,
        symbol: &str,
    ) -> Result<Vec<String>, ExternalToolError>
    {
        // -d: query the database as built, never rebuild it here
        let mut cmd = Command::new(&self.xref_program);
        cmd.args(["-d", "-L", "-2"])
            .arg(symbol)
            .current_dir(workdir);

        let out =
            run_tool(Service::Query, &mut cmd, self.timeout)?.require_success(Service::Query)?;

        Ok(out
            .stdout
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Parse `path:line:text` records as printed by `rg --with-filename --line-number`.
///
/// With `--null` the path is terminated by NUL instead of `:`, which keeps
/// paths containing colons intact. Rows without a positive line number are skipped.
pub fn parse_search_output(stdout: &str) -> Hits
{
    let mut hits = Hits::new();

    for row in stdout.lines()
    {
        match parse_search_record(row)
        {
            Some((path, line)) => hits
                .entry(path)
                .or_default()
                .push(line),
            None =>
            {
                if !row
                    .trim()
                    .is_empty()
                {
                    trace!(row, "skipping unparseable search record");
                }
            }
        }
    }

    hits
}

fn parse_search_record(row: &str) -> Option<(PathBuf, usize)>
{
    // NUL terminates the path under --null; fall back to the first colon
    let (path, rest) = match row.split_once('\0')
    {
        Some(split) => split,
        None => row.split_once(':')?,
    };

    let (line, _text) = rest.split_once(':')?;
    let line: usize = line
        .trim()
        .parse()
        .ok()?;

    if path.is_empty() || line == 0
    {
        return None;
    }

    Some((PathBuf::from(path), line))
}

/// Split JSON-lines tag output into field bags. Lines that are not JSON
/// objects are tag-tool chatter and are dropped.
pub fn parse_tag_output(stdout: &str) -> Vec<TagRecord>
{
    stdout
        .lines()
        .filter(|line| {
            !line
                .trim()
                .is_empty()
        })
        .filter_map(|line| match serde_json::from_str::<Value>(line)
        {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) =>
            {
                debug!(line, "ignoring non-record tag output");
                None
            }
        })
        .collect()
}
