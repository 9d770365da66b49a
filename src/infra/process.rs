//! Filepath: src/infra/process.rs
//! Blocking child-process runner with an optional time limit.
//!
//! Output is spooled to anonymous temp files instead of pipes: waiting on a
//! child with a timeout while its stdout pipe fills up would stall both sides.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    process::{Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::infra::error::{ExternalToolError, Service};

/// Captured result of one finished invocation.
#[derive(Debug)]
pub struct ToolOutput
{
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput
{
    /// Pass the output through when the tool exited cleanly.
    pub fn require_success(
        self,
        service: Service,
    ) -> Result<Self, ExternalToolError>
    {
        if self
            .status
            .success()
        {
            Ok(self)
        }
        else
        {
            Err(self.into_failure(service))
        }
    }

    /// Convert a non-zero exit into the typed error, keeping stderr as diagnostic.
    pub fn into_failure(
        self,
        service: Service,
    ) -> ExternalToolError
    {
        ExternalToolError::Failed {
            service,
            status: self
                .status
                .code(),
            diagnostic: self.stderr,
        }
    }
}

/// Run `cmd` to completion (or until `timeout`) and capture its output.
///
/// Stdin is closed. On timeout the child is killed and reaped before
/// returning [`ExternalToolError::TimedOut`].
pub fn run_tool(
    service: Service,
    cmd: &mut Command,
    timeout: Option<Duration>,
) -> Result<ToolOutput, ExternalToolError>
{
    let workspace = |source| ExternalToolError::Workspace { service, source };

    let mut out_spool = tempfile::tempfile().map_err(workspace)?;
    let mut err_spool = tempfile::tempfile().map_err(workspace)?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(
            out_spool
                .try_clone()
                .map_err(workspace)?,
        ))
        .stderr(Stdio::from(
            err_spool
                .try_clone()
                .map_err(workspace)?,
        ));

    debug!(%service, command = ?cmd, "invoking external tool");

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|source| ExternalToolError::Unavailable { service, source })?;

    let status = match timeout
    {
        Some(limit) => match child
            .wait_timeout(limit)
            .map_err(workspace)?
        {
            Some(status) => status,
            None =>
            {
                // Kill, then reap so no zombie outlives the run
                let _ = child.kill();
                let _ = child.wait();
                warn!(%service, ?limit, "external tool timed out");
                return Err(ExternalToolError::TimedOut { service, after: limit });
            }
        },
        None => child
            .wait()
            .map_err(workspace)?,
    };

    let stdout = read_spool(&mut out_spool).map_err(workspace)?;
    let stderr = read_spool(&mut err_spool).map_err(workspace)?;

    debug!(
        %service,
        code = ?status.code(),
        elapsed = ?started.elapsed(),
        stdout_bytes = stdout.len(),
        "external tool finished"
    );

    Ok(ToolOutput { status, stdout, stderr })
}

fn read_spool(spool: &mut File) -> std::io::Result<String>
{
    spool.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    spool.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
