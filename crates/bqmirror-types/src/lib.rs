//! Shared bqmirror data model: catalogue entries, warehouse references,
//! the warehouse error taxonomy, and run reports.
//!
//! Kept free of I/O so the warehouse and engine crates can both depend on it.

#![warn(clippy::pedantic)]

pub mod catalogue;
pub mod error;
pub mod report;
pub mod target;

pub use catalogue::{CatalogueEntry, EntryKind};
pub use error::{WarehouseError, WarehouseErrorKind};
pub use report::{OperationResult, Outcome, PhaseSummary, RunReport, RunStatus};
pub use target::{DatasetRef, ReplicationTarget, TableRef};
