use crate::error::Result;
use std::future::Future;
use tracing::warn;

/// Runs a write whose failure must not mask the surrounding outcome.
///
/// The error is logged with `context` and discarded; `None` signals the write
/// did not happen.
pub async fn best_effort<T, F>(context: &str, op: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match op.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, context, "Best-effort operation failed; continuing");
            None
        }
    }
}
