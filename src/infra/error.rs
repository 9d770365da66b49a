//! Filepath: src/infra/error.rs
//! Typed failures of the external collaborators (search, tags, cross-reference).
//!
//! Empty results are never errors: a search with no matches, a file without
//! functions and a function without callees all come back as empty containers.
//! Only the tools themselves failing ends up here.

use std::{fmt, io, time::Duration};

/// The external service an error (or an invocation) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service
{
    /// Pattern search over the tree (ripgrep)
    Search,
    /// Per-file function tags (universal-ctags)
    Tag,
    /// Reference database construction (cscope -b)
    DatabaseBuild,
    /// Callee lookup against the reference database (cscope -L -2)
    Query,
}

impl fmt::Display for Service
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            Service::Search => write!(f, "search"),
            Service::Tag => write!(f, "tag"),
            Service::DatabaseBuild => write!(f, "database build"),
            Service::Query => write!(f, "cross-reference query"),
        }
    }
}

/// A failed external-tool invocation. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum ExternalToolError
{
    /// The tool ran and exited with an error status
    #[error("{service} service exited with {}: {}", describe_status(.status), .diagnostic.trim())]
    Failed
    {
        service: Service,
        status: Option<i32>,
        diagnostic: String,
    },

    /// The tool could not be started at all (missing binary, permissions)
    #[error("{service} service is unavailable: {source}")]
    Unavailable
    {
        service: Service,
        #[source]
        source: io::Error,
    },

    /// The tool exceeded its time limit and was killed
    #[error("{service} service timed out after {after:?}")]
    TimedOut
    {
        service: Service,
        after: Duration,
    },

    /// Local I/O around the invocation failed (scratch dirs, manifests, output spools)
    #[error("{service} service workspace error: {source}")]
    Workspace
    {
        service: Service,
        #[source]
        source: io::Error,
    },
}

impl ExternalToolError
{
    /// Service the failure is attributed to.
    pub fn service(&self) -> Service
    {
        match self
        {
            ExternalToolError::Failed { service, .. }
            | ExternalToolError::Unavailable { service, .. }
            | ExternalToolError::TimedOut { service, .. }
            | ExternalToolError::Workspace { service, .. } => *service,
        }
    }

    pub fn is_timeout(&self) -> bool
    {
        matches!(self, ExternalToolError::TimedOut { .. })
    }

    /// Exit status of the tool, when it ran to completion.
    pub fn exit_status(&self) -> Option<i32>
    {
        match self
        {
            ExternalToolError::Failed { status, .. } => *status,
            _ => None,
        }
    }
}

fn describe_status(status: &Option<i32>) -> String
{
    match status
    {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
