//! Filepath: src/core/locate.rs
//! Match locator: every occurrence of a pattern under the tree root,
//! grouped per file as 1-based line numbers.

use std::path::Path;

use tracing::{debug, instrument};

pub use crate::infra::services::{Hits, SearchMode};
use crate::infra::{error::ExternalToolError, services::ExternalServices};

/// Case-insensitive search for `pattern` under `root`.
///
/// No matches is an empty map, not an error.
#[instrument(skip(services))]
pub fn locate<S>(
    services: &S,
    pattern: &str,
    root: &Path,
) -> Result<Hits, ExternalToolError>
where
    S: ExternalServices + ?Sized,
{
    let hits = services.search(pattern, root)?;

    debug!(
        files = hits.len(),
        matches = hits
            .values()
            .map(Vec::len)
            .sum::<usize>(),
        "located matches"
    );

    Ok(hits)
}
