//! Error types for sitekeeper-runner.

use std::time::Duration;

use thiserror::Error;

/// Failures to run an external process at all.
///
/// A process that ran and exited non-zero is not an error at this layer; see
/// [`crate::CommandOutput::success`].
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("'{program}' was cancelled")]
    Cancelled { program: String },

    #[error("job limiter closed")]
    Closed,
}
