//! Replication engine for bqmirror: catalogue configuration, the two-phase
//! orchestrator, retry policy, and run reporting.

#![warn(clippy::pedantic)]

pub mod catalogue;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod report;

// Re-export public API for convenience
pub use catalogue::Catalogue;
pub use errors::{ConfigError, RunError};
pub use orchestrator::{
    check_target, discover_catalogue, plan, run_replication, CheckResult, PlannedOperation,
    RunPhase,
};
pub use report::{ConsoleReporter, NoopProgress, ProgressSink};
