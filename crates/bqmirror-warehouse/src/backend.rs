//! Warehouse trait definition.
//!
//! [`Warehouse`] is the seam between the replication engine and a concrete
//! data warehouse. Model types live in [`bqmirror_types`].

use async_trait::async_trait;
use bqmirror_types::{CatalogueEntry, DatasetRef, TableRef, WarehouseError};

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WarehouseError>;

/// Operations the replication engine needs from a warehouse.
///
/// Every method resolves only once the warehouse has confirmed completion
/// or failure; any asynchronous job handling stays inside the implementation.
/// Implementations must be `Send + Sync` for use behind `Arc<dyn Warehouse>`.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Replace `destination` with the current contents and schema of `source`.
    ///
    /// When `location` is `None` the warehouse infers the job region, which
    /// fails if the two datasets live in different regions.
    ///
    /// # Errors
    ///
    /// Returns a classified [`WarehouseError`] when the copy job fails.
    async fn copy_table(
        &self,
        source: &TableRef,
        destination: &TableRef,
        location: Option<&str>,
    ) -> Result<()>;

    /// Run `SELECT * FROM view` and overwrite `destination` with the result.
    ///
    /// # Errors
    ///
    /// Returns a classified [`WarehouseError`] when the query job fails.
    async fn materialize_view(&self, view: &TableRef, destination: &TableRef) -> Result<()>;

    /// Region the dataset is stored in (e.g. `US`, `europe-west2`).
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] if the dataset cannot be read.
    async fn dataset_location(&self, dataset: &DatasetRef) -> Result<String>;

    /// Create `dataset` in `location` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a `LOCATION_MISMATCH` error when the dataset already exists in a
    /// different region, or any other classified failure from the warehouse.
    async fn ensure_dataset(&self, dataset: &DatasetRef, location: &str) -> Result<()>;

    /// List the tables and views stored in a dataset, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] if the dataset cannot be listed.
    async fn list_objects(&self, dataset: &DatasetRef) -> Result<Vec<CatalogueEntry>>;
}
