//! Filepath: src/core/xref.rs
//! Cross-reference edge fetcher.
//!
//! A [`ReferenceDb`] is a scratch directory holding the file manifest and the
//! database the build service materialises next to it. It is created once per
//! run and removed when dropped, whichever way the run ends.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, instrument, trace};

pub use crate::infra::config::CalleeColumn;
use crate::infra::{
    error::{ExternalToolError, Service},
    services::ExternalServices,
};

/// Manifest file name the database-build service reads inside the workdir.
pub const MANIFEST_NAME: &str = "cscope.files";

/// Rows with fewer whitespace-delimited fields are not edges.
pub const MIN_ROW_FIELDS: usize = 4;

/// One `caller → callee` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CallEdge
{
    pub caller: String,
    pub callee: String,
}

impl CallEdge
{
    pub fn new(
        caller: impl Into<String>,
        callee: impl Into<String>,
    ) -> Self
    {
        Self { caller: caller.into(), callee: callee.into() }
    }
}

/// Reference database scoped to a set of files.
#[derive(Debug)]
pub struct ReferenceDb
{
    workdir: TempDir,
    manifest: PathBuf,
    files: usize,
    column: CalleeColumn,
}

impl ReferenceDb
{
    /// Write the manifest into a fresh scratch directory and build the
    /// database there. The directory is gone again if the build fails.
    #[instrument(skip_all, fields(files = scope.len()))]
    pub fn build<S>(
        services: &S,
        scope: &BTreeSet<PathBuf>,
        column: CalleeColumn,
    ) -> Result<Self, ExternalToolError>
    where
        S: ExternalServices + ?Sized,
    {
        let workspace =
            |source| ExternalToolError::Workspace { service: Service::DatabaseBuild, source };

        let workdir = tempfile::Builder::new()
            .prefix("tracegraph-xref-")
            .tempdir()
            .map_err(workspace)?;

        let manifest = workdir
            .path()
            .join(MANIFEST_NAME);
        let listing = scope
            .iter()
            .map(|path| path.to_string_lossy())
            .join("\n");
        fs::write(&manifest, listing).map_err(workspace)?;

        // Dropping `db` removes the workdir, failed build included
        let db = Self { workdir, manifest, files: scope.len(), column };
        services.build_database(db.workdir(), db.manifest())?;

        debug!(
            workdir = %db.workdir().display(),
            manifest = %db.manifest().display(),
            files = db.file_count(),
            "reference database ready"
        );

        Ok(db)
    }

    /// Directory the query service must run in.
    pub fn workdir(&self) -> &Path
    {
        self.workdir
            .path()
    }

    pub fn manifest(&self) -> &Path
    {
        &self.manifest
    }

    /// Number of files the database covers.
    pub fn file_count(&self) -> usize
    {
        self.files
    }

    pub fn callee_column(&self) -> CalleeColumn
    {
        self.column
    }
}

/// Functions called by `function`, as edges whose caller is `function`.
#[instrument(skip(services, db))]
pub fn edges_from<S>(
    services: &S,
    db: &ReferenceDb,
    function: &str,
) -> Result<Vec<CallEdge>, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    let rows = services.query_callees(db.workdir(), function)?;
    let edges = parse_callee_rows(function, &rows, db.callee_column());

    debug!(rows = rows.len(), edges = edges.len(), "fetched callees");

    Ok(edges)
}

/// Turn query rows into edges. Short rows are noise (headers, diagnostics)
/// and are dropped without error.
pub fn parse_callee_rows<R>(
    caller: &str,
    rows: &[R],
    column: CalleeColumn,
) -> Vec<CallEdge>
where
    R: AsRef<str>,
{
    rows.iter()
        .filter_map(|row| {
            let row = row.as_ref();
            let fields: Vec<&str> = row
                .split_whitespace()
                .collect();

            if fields.len() < MIN_ROW_FIELDS
            {
                trace!(row, "skipping short cross-reference row");
                return None;
            }

            let callee = match column
            {
                CalleeColumn::Last => fields.last()?,
                CalleeColumn::Second => fields.get(1)?,
            };

            Some(CallEdge::new(caller, *callee))
        })
        .collect()
}
