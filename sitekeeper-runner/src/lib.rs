//! # sitekeeper-runner
//!
//! The only way sitekeeper talks to the outside world: external processes.
//!
//! [`CommandRunner`] is the capability seam. [`ProcessRunner`] runs real
//! subprocesses with a concurrency limit, timeout and cancellation;
//! [`HugoEngine`] and [`GitFetcher`] translate store operations into
//! [`Invocation`]s. With the `fake` feature, [`fake::FakeRunner`] stands in
//! for both tools in tests.

pub mod engine;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod fetcher;
pub mod runner;

pub use engine::HugoEngine;
pub use error::RunnerError;
pub use fetcher::GitFetcher;
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use tokio_util::sync::CancellationToken;
