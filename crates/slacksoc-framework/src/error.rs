//! Error types for the slacksoc framework.

use thiserror::Error;

pub use tower::BoxError;

/// Returned by a filter predicate when an event does **not** match.
///
/// The dispatcher recognises this error and silently skips the handler. All
/// other errors are treated as genuine failures.
#[derive(Debug, Clone, Error)]
#[error("event skipped by filter")]
pub struct EventSkipped;

/// Returns `true` if `err` is a filter rejection rather than a failure.
pub fn is_skipped(err: &BoxError) -> bool {
    err.is::<EventSkipped>()
}
