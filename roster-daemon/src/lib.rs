//! Scheduled trigger: runs `scheduled` sync jobs on an interval and whenever
//! the configured source file changes.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, run_scheduled, start_blocking};
