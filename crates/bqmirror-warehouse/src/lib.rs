//! Warehouse client layer for bqmirror.
//!
//! Provides the [`Warehouse`] trait, a BigQuery REST implementation
//! ([`BigQueryWarehouse`]) and an in-memory implementation
//! ([`InMemoryWarehouse`]) used by tests and local rehearsals.

#![warn(clippy::pedantic)]

pub mod auth;
pub mod backend;
pub mod bigquery;
pub mod memory;

pub use auth::{AccessTokenSource, GcpTokenSource, StaticToken};
pub use backend::{Result, Warehouse};
pub use bigquery::{BigQueryConfig, BigQueryWarehouse};
pub use memory::{InMemoryWarehouse, WarehouseCall};
