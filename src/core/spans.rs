//! Filepath: src/core/spans.rs
//! Function boundary resolver.
//!
//! The tag service only reports where each function *starts*. Ends are
//! inferred: a function runs until the line before the next function, and
//! the last one in the file is open-ended.
//!
//! Tag records arrive as untyped JSON objects; [`spans_from_tags`] is the
//! only place that looks inside them.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::infra::{
    error::ExternalToolError,
    services::{ExternalServices, TagRecord},
};

/// Tag kind consumed from the tag service; everything else is ignored.
pub const FUNCTION_KIND: &str = "function";

/// Closed line interval `[start, end]` of one function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSpan
{
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl FunctionSpan
{
    /// End of the last span in a file: any line at or after its start belongs to it.
    pub const OPEN_END: usize = usize::MAX;

    pub fn new(
        name: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self
    {
        Self { name: name.into(), start, end }
    }

    pub fn contains(
        &self,
        line: usize,
    ) -> bool
    {
        self.start <= line && line <= self.end
    }

    pub fn is_open_ended(&self) -> bool
    {
        self.end == Self::OPEN_END
    }
}

/// Function spans of `file`, ordered by start line.
///
/// A file without functions yields an empty vector.
#[instrument(skip(services))]
pub fn resolve<S>(
    services: &S,
    file: &Path,
) -> Result<Vec<FunctionSpan>, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    let records = services.tag(file)?;
    let spans = spans_from_tags(&records);

    debug!(records = records.len(), functions = spans.len(), "resolved function spans");

    Ok(spans)
}

/// Convert raw tag records into inferred spans, discarding anything that is
/// not a well-formed function tag.
pub fn spans_from_tags(records: &[TagRecord]) -> Vec<FunctionSpan>
{
    let starts = records
        .iter()
        .filter_map(function_start)
        .collect();

    infer_spans(starts)
}

/// Validate one tag record: `kind == "function"`, a non-empty `name` and a
/// positive `line` (number or numeric string). Pseudo-tags are rejected.
fn function_start(record: &TagRecord) -> Option<(String, usize)>
{
    if let Some(ty) = record
        .get("_type")
        .and_then(Value::as_str)
    {
        if ty != "tag"
        {
            return None;
        }
    }

    if record
        .get("kind")
        .and_then(Value::as_str)
        != Some(FUNCTION_KIND)
    {
        return None;
    }

    let name = record
        .get("name")?
        .as_str()?;

    let line = match record.get("line")?
    {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s
            .trim()
            .parse()
            .ok()?,
        _ => return None,
    };

    let line = usize::try_from(line).ok()?;

    if name.is_empty() || line == 0
    {
        trace!(?record, "discarding malformed function tag");
        return None;
    }

    Some((name.to_string(), line))
}

/// Sort-and-next-boundary rule.
///
/// The sort is stable, so functions sharing a start line stay in emission
/// order. Each span ends one line before the next *strictly greater* start;
/// spans with equal starts therefore share one interval and the first emitted
/// wins any containment scan.
pub fn infer_spans(mut starts: Vec<(String, usize)>) -> Vec<FunctionSpan>
{
    starts.sort_by_key(|&(_, start)| start);

    let mut spans = Vec::with_capacity(starts.len());
    let mut end = FunctionSpan::OPEN_END;
    let mut boundary: Option<usize> = None;

    for (name, start) in starts
        .into_iter()
        .rev()
    {
        if let Some(next) = boundary
        {
            if start < next
            {
                end = next - 1;
            }
        }
        boundary = Some(start);
        spans.push(FunctionSpan { name, start, end });
    }

    spans.reverse();
    spans
}

/// First span (in ascending start order) whose interval contains `line`.
pub fn containing_span(
    spans: &[FunctionSpan],
    line: usize,
) -> Option<&FunctionSpan>
{
    spans
        .iter()
        .find(|span| span.contains(line))
}
