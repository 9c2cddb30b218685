//! Replication config: serde types, YAML parsing, and semantic validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use types::{DatasetConfig, DestinationConfig, ReplicationConfig, RetryConfig, WarehouseSettings};
