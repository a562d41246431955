//! Progress reporting seam.

/// Receives human-readable progress while a workflow runs.
///
/// `status` is a transient line that may be overwritten (a spinner message
/// in the CLI); `info` is a persistent line.
pub trait Reporter: Send + Sync {
    fn status(&self, message: &str);
    fn info(&self, message: &str);
}

/// Discards all progress. Used by tests and non-interactive callers.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn status(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
}
