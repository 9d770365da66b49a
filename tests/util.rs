//! Shared test utilities for integration tests
//!
//! Provides a fixture-backed `ExternalServices` so the pipeline can run
//! without ripgrep, ctags or cscope installed, plus `sh` stand-ins for the
//! tools themselves so the process-backed services can be driven too.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use serde_json::json;
use tracegraph::{
    core::Hits,
    infra::{ExternalServices, ExternalToolError, Service, TagRecord},
};

/// Canned responses plus a log of every request made.
#[derive(Default)]
pub struct FixtureServices
{
    hits: Hits,
    tags: HashMap<PathBuf, Vec<TagRecord>>,
    rows: HashMap<String, Vec<String>>,
    failing_tags: HashSet<PathBuf>,
    failing_queries: HashSet<String>,
    fail_build: bool,

    /// Files the tag service was asked about, in order
    pub tagged: RefCell<Vec<PathBuf>>,
    /// Symbols the query service was asked about, in order
    pub queried: RefCell<Vec<String>>,
    /// Working directories handed to the build service
    pub workdirs: RefCell<Vec<PathBuf>>,
    /// Manifest contents seen by the build service
    pub manifests: RefCell<Vec<String>>,
}

impl FixtureServices
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Search result: `file` matched on `lines`.
    pub fn with_hits(
        mut self,
        file: &str,
        lines: &[usize],
    ) -> Self
    {
        self.hits
            .entry(PathBuf::from(file))
            .or_default()
            .extend_from_slice(lines);
        self
    }

    /// Tag output for `file`: one function tag per `(name, line)`, in emission order.
    pub fn with_functions(
        mut self,
        file: &str,
        functions: &[(&str, usize)],
    ) -> Self
    {
        let records = functions
            .iter()
            .map(|&(name, line)| {
                tag_record(json!({
                    "_type": "tag",
                    "name": name,
                    "path": file,
                    "language": "C",
                    "line": line,
                    "kind": "function",
                }))
            })
            .collect();
        self.tags
            .insert(PathBuf::from(file), records);
        self
    }

    /// Raw query rows for `function`.
    pub fn with_rows(
        mut self,
        function: &str,
        rows: &[&str],
    ) -> Self
    {
        self.rows
            .insert(
                function.to_string(),
                rows.iter()
                    .map(|r| r.to_string())
                    .collect(),
            );
        self
    }

    /// Convenience: `caller` calls each of `callees` (cscope-shaped rows).
    pub fn with_calls(
        self,
        caller: &str,
        callees: &[&str],
    ) -> Self
    {
        let rows: Vec<String> = callees
            .iter()
            .enumerate()
            .map(|(i, callee)| format!("src/{caller}.c {caller} {} {callee}", 10 + i))
            .collect();
        let refs: Vec<&str> = rows
            .iter()
            .map(String::as_str)
            .collect();
        self.with_rows(caller, &refs)
    }

    pub fn failing_tag(
        mut self,
        file: &str,
    ) -> Self
    {
        self.failing_tags
            .insert(PathBuf::from(file));
        self
    }

    pub fn failing_query(
        mut self,
        function: &str,
    ) -> Self
    {
        self.failing_queries
            .insert(function.to_string());
        self
    }

    pub fn failing_build(mut self) -> Self
    {
        self.fail_build = true;
        self
    }

    pub fn hits(&self) -> &Hits
    {
        &self.hits
    }
}

impl ExternalServices for FixtureServices
{
    fn search(
        &self,
        _pattern: &str,
        _root: &Path,
    ) -> Result<Hits, ExternalToolError>
    {
        Ok(self
            .hits
            .clone())
    }

    fn tag(
        &self,
        file: &Path,
    ) -> Result<Vec<TagRecord>, ExternalToolError>
    {
        self.tagged
            .borrow_mut()
            .push(file.to_path_buf());

        if self
            .failing_tags
            .contains(file)
        {
            return Err(ExternalToolError::Failed {
                service: Service::Tag,
                status: Some(1),
                diagnostic: format!("ctags: cannot open {}", file.display()),
            });
        }

        Ok(self
            .tags
            .get(file)
            .cloned()
            .unwrap_or_default())
    }

    fn build_database(
        &self,
        workdir: &Path,
        manifest: &Path,
    ) -> Result<(), ExternalToolError>
    {
        assert!(workdir.is_dir(), "workdir must exist before the build");
        assert!(manifest.starts_with(workdir), "manifest must live in the workdir");

        self.workdirs
            .borrow_mut()
            .push(workdir.to_path_buf());
        self.manifests
            .borrow_mut()
            .push(fs::read_to_string(manifest).expect("manifest readable"));

        if self.fail_build
        {
            return Err(ExternalToolError::Failed {
                service: Service::DatabaseBuild,
                status: Some(1),
                diagnostic: "cscope: cannot build cross-reference".to_string(),
            });
        }

        fs::write(workdir.join("cscope.out"), "fixture").expect("write fake database");
        Ok(())
    }

    fn query_callees(
        &self,
        workdir: &Path,
        symbol: &str,
    ) -> Result<Vec<String>, ExternalToolError>
    {
        assert!(
            workdir
                .join("cscope.out")
                .exists(),
            "queries must run against a built database"
        );

        self.queried
            .borrow_mut()
            .push(symbol.to_string());

        if self
            .failing_queries
            .contains(symbol)
        {
            return Err(ExternalToolError::Failed {
                service: Service::Query,
                status: Some(2),
                diagnostic: "cscope: query failed".to_string(),
            });
        }

        Ok(self
            .rows
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }
}

fn tag_record(value: serde_json::Value) -> TagRecord
{
    match value
    {
        serde_json::Value::Object(map) => map,
        other => panic!("tag fixture must be an object, got {other}"),
    }
}

/// Write an executable `sh` script named `name` into `dir`.
///
/// Before running `body` the script records its argv (one per line) in
/// `<name>.args` and its working directory in `<name>.cwd`.
#[cfg(unix)]
pub fn stand_in_tool(
    dir: &Path,
    name: &str,
    body: &str,
) -> PathBuf
{
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{args}'\npwd > '{cwd}'\n{body}\n",
        args = path
            .with_extension("args")
            .display(),
        cwd = path
            .with_extension("cwd")
            .display(),
    );

    // Written and closed before anyone executes it
    fs::write(&path, script).expect("write stand-in");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stand-in");
    path
}

/// Argv the stand-in at `tool` was last invoked with.
pub fn recorded_args(tool: &Path) -> Vec<String>
{
    fs::read_to_string(tool.with_extension("args"))
        .expect("stand-in ran")
        .lines()
        .map(str::to_string)
        .collect()
}

/// Working directory the stand-in at `tool` last ran in.
pub fn recorded_cwd(tool: &Path) -> PathBuf
{
    PathBuf::from(
        fs::read_to_string(tool.with_extension("cwd"))
            .expect("stand-in ran")
            .trim_end(),
    )
}
