//! In-memory [`Warehouse`] for tests and local rehearsals.
//!
//! Datasets carry a region, tables hold JSON rows, and views select every row
//! from another table. Failures can be scripted per object, and every call is
//! logged so tests can assert what the engine attempted.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bqmirror_types::{CatalogueEntry, DatasetRef, TableRef, WarehouseError};
use serde_json::Value;

use crate::backend::{Result, Warehouse};

/// A call observed by [`InMemoryWarehouse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseCall {
    CopyTable {
        source: TableRef,
        destination: TableRef,
        location: Option<String>,
    },
    MaterializeView {
        view: TableRef,
        destination: TableRef,
    },
    DatasetLocation(DatasetRef),
    EnsureDataset {
        dataset: DatasetRef,
        location: String,
    },
    ListObjects(DatasetRef),
}

#[derive(Debug, Clone)]
enum StoredObject {
    Table(Vec<Value>),
    View { selects_from: TableRef },
}

#[derive(Debug, Default)]
struct StoredDataset {
    location: String,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug, Default)]
struct State {
    datasets: HashMap<DatasetRef, StoredDataset>,
    faults: HashMap<TableRef, VecDeque<WarehouseError>>,
    latency: HashMap<TableRef, Duration>,
    calls: Vec<WarehouseCall>,
}

/// Thread-safe in-memory warehouse.
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    state: Mutex<State>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryWarehouse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an (empty) dataset in `location`.
    #[must_use]
    pub fn with_dataset(self, dataset: &DatasetRef, location: &str) -> Self {
        self.lock().datasets.insert(
            dataset.clone(),
            StoredDataset {
                location: location.to_string(),
                objects: BTreeMap::new(),
            },
        );
        self
    }

    /// Add a table with rows. The dataset must have been registered.
    ///
    /// # Panics
    ///
    /// Panics if the table's dataset is unknown.
    #[must_use]
    pub fn with_table(self, table: &TableRef, rows: Vec<Value>) -> Self {
        self.insert_object(table, StoredObject::Table(rows));
        self
    }

    /// Add a view that selects every row of `selects_from`.
    ///
    /// # Panics
    ///
    /// Panics if the view's dataset is unknown.
    #[must_use]
    pub fn with_view(self, view: &TableRef, selects_from: &TableRef) -> Self {
        self.insert_object(
            view,
            StoredObject::View {
                selects_from: selects_from.clone(),
            },
        );
        self
    }

    fn insert_object(&self, object: &TableRef, stored: StoredObject) {
        let mut state = self.lock();
        let dataset = state
            .datasets
            .get_mut(&object.dataset_ref())
            .unwrap_or_else(|| panic!("dataset {} not registered", object.dataset_ref()));
        dataset.objects.insert(object.table.clone(), stored);
    }

    /// Fail the next call that reads `object` with `error`. Queued errors are
    /// consumed in order, one per call.
    pub fn fail_next(&self, object: &TableRef, error: WarehouseError) {
        self.lock()
            .faults
            .entry(object.clone())
            .or_default()
            .push_back(error);
    }

    /// Delay every call that reads `object`.
    pub fn set_latency(&self, object: &TableRef, latency: Duration) {
        self.lock().latency.insert(object.clone(), latency);
    }

    /// Rows currently stored in a table, or `None` if it does not exist.
    #[must_use]
    pub fn table_rows(&self, table: &TableRef) -> Option<Vec<Value>> {
        let state = self.lock();
        match state.datasets.get(&table.dataset_ref())?.objects.get(&table.table)? {
            StoredObject::Table(rows) => Some(rows.clone()),
            StoredObject::View { .. } => None,
        }
    }

    /// Replace the rows of an existing table, simulating upstream changes.
    pub fn replace_rows(&self, table: &TableRef, rows: Vec<Value>) {
        self.insert_object(table, StoredObject::Table(rows));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<WarehouseCall> {
        self.lock().calls.clone()
    }

    /// Highest number of concurrent copy/materialize calls observed.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: WarehouseCall) {
        self.lock().calls.push(call);
    }

    /// Shared prologue for data-moving calls: bookkeeping, latency, faults.
    async fn enter(&self, object: &TableRef) -> Result<InFlight<'_>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let latency = self.lock().latency.get(object).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let fault = self
            .lock()
            .faults
            .get_mut(object)
            .and_then(VecDeque::pop_front);
        match fault {
            Some(err) => Err(err),
            None => Ok(guard),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn dataset<'a>(state: &'a State, dataset: &DatasetRef) -> Result<&'a StoredDataset> {
    state
        .datasets
        .get(dataset)
        .ok_or_else(|| WarehouseError::not_found(format!("Not found: Dataset {dataset}")))
}

fn read_table(state: &State, table: &TableRef) -> Result<Vec<Value>> {
    match dataset(state, &table.dataset_ref())?.objects.get(&table.table) {
        Some(StoredObject::Table(rows)) => Ok(rows.clone()),
        Some(StoredObject::View { .. }) => Err(WarehouseError::unknown(format!(
            "{table} is a view and cannot be copied"
        ))),
        None => Err(WarehouseError::not_found(format!("Not found: Table {table}"))),
    }
}

fn write_table(state: &mut State, table: &TableRef, rows: Vec<Value>) -> Result<()> {
    let stored = state
        .datasets
        .get_mut(&table.dataset_ref())
        .ok_or_else(|| {
            WarehouseError::not_found(format!("Not found: Dataset {}", table.dataset_ref()))
        })?;
    stored
        .objects
        .insert(table.table.clone(), StoredObject::Table(rows));
    Ok(())
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn copy_table(
        &self,
        source: &TableRef,
        destination: &TableRef,
        location: Option<&str>,
    ) -> Result<()> {
        self.record(WarehouseCall::CopyTable {
            source: source.clone(),
            destination: destination.clone(),
            location: location.map(str::to_string),
        });
        let _guard = self.enter(source).await?;

        let mut state = self.lock();
        let rows = read_table(&state, source)?;
        let src_location = dataset(&state, &source.dataset_ref())?.location.clone();
        let dst_location = dataset(&state, &destination.dataset_ref())?.location.clone();

        match location {
            Some(loc)
                if !loc.eq_ignore_ascii_case(&src_location)
                    || !loc.eq_ignore_ascii_case(&dst_location) =>
            {
                return Err(WarehouseError::location_mismatch(format!(
                    "Job location {loc} does not match source ({src_location}) and destination ({dst_location})"
                )));
            }
            None if !src_location.eq_ignore_ascii_case(&dst_location) => {
                return Err(WarehouseError::location_mismatch(format!(
                    "Cannot read and write in different locations: source: {src_location}, destination: {dst_location}"
                )));
            }
            _ => {}
        }

        write_table(&mut state, destination, rows)
    }

    async fn materialize_view(&self, view: &TableRef, destination: &TableRef) -> Result<()> {
        self.record(WarehouseCall::MaterializeView {
            view: view.clone(),
            destination: destination.clone(),
        });
        let _guard = self.enter(view).await?;

        let mut state = self.lock();
        let view_dataset = dataset(&state, &view.dataset_ref())?;
        let selects_from = match view_dataset.objects.get(&view.table) {
            Some(StoredObject::View { selects_from }) => selects_from.clone(),
            Some(StoredObject::Table(_)) => view.clone(),
            None => return Err(WarehouseError::not_found(format!("Not found: Table {view}"))),
        };
        let view_location = view_dataset.location.clone();
        let dst_location = dataset(&state, &destination.dataset_ref())?.location.clone();
        if !view_location.eq_ignore_ascii_case(&dst_location) {
            return Err(WarehouseError::location_mismatch(format!(
                "Cannot read and write in different locations: source: {view_location}, destination: {dst_location}"
            )));
        }

        let rows = read_table(&state, &selects_from)?;
        write_table(&mut state, destination, rows)
    }

    async fn dataset_location(&self, dataset_ref: &DatasetRef) -> Result<String> {
        self.record(WarehouseCall::DatasetLocation(dataset_ref.clone()));
        let state = self.lock();
        Ok(dataset(&state, dataset_ref)?.location.clone())
    }

    async fn ensure_dataset(&self, dataset_ref: &DatasetRef, location: &str) -> Result<()> {
        self.record(WarehouseCall::EnsureDataset {
            dataset: dataset_ref.clone(),
            location: location.to_string(),
        });
        let mut state = self.lock();
        match state.datasets.get(dataset_ref) {
            Some(existing) if existing.location.eq_ignore_ascii_case(location) => Ok(()),
            Some(existing) => Err(WarehouseError::location_mismatch(format!(
                "Destination dataset {dataset_ref} is in location {} but source dataset is in {location}",
                existing.location
            ))),
            None => {
                state.datasets.insert(
                    dataset_ref.clone(),
                    StoredDataset {
                        location: location.to_string(),
                        objects: BTreeMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn list_objects(&self, dataset_ref: &DatasetRef) -> Result<Vec<CatalogueEntry>> {
        self.record(WarehouseCall::ListObjects(dataset_ref.clone()));
        let state = self.lock();
        let stored = dataset(&state, dataset_ref)?;
        Ok(stored
            .objects
            .iter()
            .map(|(name, object)| match object {
                StoredObject::Table(_) => CatalogueEntry::table(name.clone()),
                StoredObject::View { .. } => CatalogueEntry::view(name.clone()),
            })
            .collect())
    }
}
