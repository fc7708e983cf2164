//! Submission-side error types.

use thiserror::Error;

/// Failure modes of [`crate::dispatch::ExtractorHandle::submit`].
///
/// Per-page problems (slow loads, render failures, PDF parse errors) are
/// not errors at this level; they come back as advisory annotations on
/// the result itself. These variants mean the caller got no result at all.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The dispatcher produced nothing within the outer wait bound.
    #[error("extraction timed out")]
    Timeout,
    /// The dispatcher shut down or crashed before replying.
    #[error("extraction failed")]
    WorkerGone,
}
