//! Replication orchestrator: copies tables, then materializes views, and
//! aggregates per-item outcomes into a [`RunReport`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bqmirror_types::{
    CatalogueEntry, EntryKind, OperationResult, ReplicationTarget, RunReport, TableRef,
    WarehouseError, WarehouseErrorKind,
};
use bqmirror_warehouse::Warehouse;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::catalogue::Catalogue;
use crate::config::validator::validate_config;
use crate::config::{ReplicationConfig, RetryConfig};
use crate::errors::{compute_backoff, ConfigError, RunError};
use crate::report::ProgressSink;

/// Run state machine: `Init -> CopyingTables -> MaterializingViews -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    Init,
    CopyingTables,
    MaterializingViews,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::CopyingTables => "copying_tables",
            Self::MaterializingViews => "materializing_views",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// One warehouse operation a run would issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    pub entry: CatalogueEntry,
    pub source: TableRef,
    pub destination: TableRef,
}

impl fmt::Display for PlannedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.entry.kind {
            EntryKind::Table => "copy",
            EntryKind::View => "materialize",
        };
        write!(f, "{verb} {} -> {}", self.source, self.destination)
    }
}

/// List the operations a run would issue, in execution order.
#[must_use]
pub fn plan(config: &ReplicationConfig) -> Vec<PlannedOperation> {
    let target = config.target();
    config
        .catalogue()
        .entries()
        .into_iter()
        .map(|entry| PlannedOperation {
            source: target.source_table(&entry.name),
            destination: target.destination_table(&entry.name),
            entry,
        })
        .collect()
}

/// Shared, read-only state for the worker tasks of one run.
struct RunContext {
    target: ReplicationTarget,
    retry: RetryConfig,
    warehouse: Arc<dyn Warehouse>,
    progress: Arc<dyn ProgressSink>,
}

/// Run one full replication pass.
///
/// Per-item failures never abort the run: every table is attempted, then
/// every view, and each outcome is recorded in the returned report.
///
/// # Errors
///
/// Returns [`RunError::Config`] for an empty or invalid catalogue and
/// [`RunError::Preflight`] when destination dataset creation fails. Both are
/// raised before any copy or materialization is attempted.
pub async fn run_replication(
    config: &ReplicationConfig,
    warehouse: Arc<dyn Warehouse>,
    progress: Arc<dyn ProgressSink>,
) -> Result<RunReport, RunError> {
    progress.phase_started(RunPhase::Init, 0);
    let catalogue = config.catalogue();
    if catalogue.is_empty() {
        return Err(ConfigError::EmptyCatalogue.into());
    }
    validate_config(config)?;

    let target = config.target();
    tracing::info!(
        source = %target.source,
        destination = %target.destination,
        location = target.location.as_deref(),
        tables = catalogue.tables().len(),
        views = catalogue.views().len(),
        concurrency = config.concurrency,
        "Starting replication run"
    );

    if config.destination.create_if_missing {
        ensure_destination(warehouse.as_ref(), &target)
            .await
            .map_err(RunError::Preflight)?;
    }

    let started_at = Utc::now();
    let start = Instant::now();
    let ctx = Arc::new(RunContext {
        target,
        retry: config.retry.clone(),
        warehouse,
        progress: Arc::clone(&progress),
    });

    let mut results = Vec::with_capacity(catalogue.len());

    progress.phase_started(RunPhase::CopyingTables, catalogue.tables().len());
    results.extend(run_phase(&ctx, EntryKind::Table, catalogue.tables(), config.concurrency).await);

    progress.phase_started(RunPhase::MaterializingViews, catalogue.views().len());
    results.extend(run_phase(&ctx, EntryKind::View, catalogue.views(), config.concurrency).await);

    let report = RunReport::new(results, started_at, start.elapsed().as_secs_f64());
    progress.phase_started(RunPhase::Done, 0);

    tracing::info!(
        status = ?report.status,
        tables_succeeded = report.tables.succeeded,
        tables_failed = report.tables.failed,
        views_succeeded = report.views.succeeded,
        views_failed = report.views.failed,
        duration_secs = report.duration_secs,
        "Replication run finished"
    );
    Ok(report)
}

/// Resolve the source dataset region and make sure the destination dataset
/// exists there.
async fn ensure_destination(
    warehouse: &dyn Warehouse,
    target: &ReplicationTarget,
) -> Result<(), WarehouseError> {
    let location = match &target.location {
        Some(location) => location.clone(),
        None => warehouse.dataset_location(&target.source).await?,
    };
    warehouse
        .ensure_dataset(&target.destination, &location)
        .await
}

/// Replicate every name of one kind with at most `concurrency` in flight.
/// Results come back in input order regardless of completion order.
async fn run_phase(
    ctx: &Arc<RunContext>,
    kind: EntryKind,
    names: &[String],
    concurrency: usize,
) -> Vec<OperationResult> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set: JoinSet<(usize, OperationResult)> = JoinSet::new();
    let mut slots: Vec<Option<OperationResult>> = vec![None; names.len()];
    let entry_for = |name: &String| CatalogueEntry {
        name: name.clone(),
        kind,
    };

    for (index, name) in names.iter().enumerate() {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                slots[index] = Some(record_failure(
                    ctx,
                    entry_for(name),
                    WarehouseError::unknown(format!("Semaphore closed: {e}")),
                    0,
                ));
                continue;
            }
        };

        let ctx = Arc::clone(ctx);
        let entry = entry_for(name);
        join_set.spawn(async move {
            let _permit = permit;
            (index, replicate_entry(&ctx, entry).await)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(join_err) => tracing::error!("Replication task failed: {join_err}"),
        }
    }

    // A task that panicked leaves its slot empty.
    slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| {
                record_failure(
                    ctx,
                    entry_for(name),
                    WarehouseError::unknown("Replication task panicked"),
                    1,
                )
            })
        })
        .collect()
}

fn record_failure(
    ctx: &RunContext,
    entry: CatalogueEntry,
    error: WarehouseError,
    attempts: u32,
) -> OperationResult {
    record_result(ctx, OperationResult::failure(entry, error, attempts, 0.0))
}

fn record_result(ctx: &RunContext, result: OperationResult) -> OperationResult {
    ctx.progress.item_finished(&result);
    result
}

/// Run one entry to completion, retrying transient errors with backoff.
async fn replicate_entry(ctx: &RunContext, entry: CatalogueEntry) -> OperationResult {
    let source = ctx.target.source_table(&entry.name);
    let destination = ctx.target.destination_table(&entry.name);
    let max_attempts = ctx.retry.max_attempts.max(1);
    let start = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let outcome = match entry.kind {
            EntryKind::Table => {
                ctx.warehouse
                    .copy_table(&source, &destination, ctx.target.location.as_deref())
                    .await
            }
            EntryKind::View => ctx.warehouse.materialize_view(&source, &destination).await,
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    kind = %entry.kind,
                    name = %entry.name,
                    attempt,
                    "Replicated {} -> {}",
                    source,
                    destination
                );
                return record_result(
                    ctx,
                    OperationResult::success(entry, attempt, start.elapsed().as_secs_f64()),
                );
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = compute_backoff(&ctx.retry, attempt);
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    kind = %entry.kind,
                    name = %entry.name,
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "Transient warehouse error, will retry"
                );
                ctx.progress.retrying(&entry, attempt, delay, &err);
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if err.is_retryable() {
                    tracing::error!(
                        kind = %entry.kind,
                        name = %entry.name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Max attempts exhausted, recording failure"
                    );
                } else {
                    tracing::error!(
                        kind = %entry.kind,
                        name = %entry.name,
                        error_kind = %err.kind,
                        error = %err,
                        "Non-retryable warehouse error, recording failure"
                    );
                }
                return record_result(
                    ctx,
                    OperationResult::failure(entry, err, attempt, start.elapsed().as_secs_f64()),
                );
            }
        }
    }
}

/// Outcome of `check`: dataset regions and whether copies can infer location.
#[derive(Debug)]
pub struct CheckResult {
    pub source_location: Result<String, WarehouseError>,
    pub destination_location: Result<String, WarehouseError>,
    /// Set when the configuration will fail at copy time because of regions.
    pub location_warning: Option<String>,
}

impl CheckResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.source_location.is_ok()
            && self.destination_location.is_ok()
            && self.location_warning.is_none()
    }
}

/// Validate the config and resolve the regions of both datasets.
///
/// A missing destination dataset is acceptable when `create_if_missing` is set.
///
/// # Errors
///
/// Returns [`ConfigError`] if the config is invalid.
pub async fn check_target(
    config: &ReplicationConfig,
    warehouse: &dyn Warehouse,
) -> Result<CheckResult, ConfigError> {
    validate_config(config)?;
    let target = config.target();

    let source_location = warehouse.dataset_location(&target.source).await;
    let mut destination_location = warehouse.dataset_location(&target.destination).await;
    if config.destination.create_if_missing {
        if let (Err(err), Ok(src)) = (&destination_location, &source_location) {
            if err.kind == WarehouseErrorKind::NotFound {
                destination_location = Ok(src.clone());
            }
        }
    }

    let location_warning = match (&source_location, &destination_location) {
        (Ok(src), Ok(dst)) => location_warning(target.location.as_deref(), src, dst),
        _ => None,
    };

    Ok(CheckResult {
        source_location,
        destination_location,
        location_warning,
    })
}

fn location_warning(configured: Option<&str>, source: &str, destination: &str) -> Option<String> {
    match configured {
        Some(loc) if !loc.eq_ignore_ascii_case(source) || !loc.eq_ignore_ascii_case(destination) => {
            Some(format!(
                "location {loc} does not match source ({source}) and destination ({destination})"
            ))
        }
        None if !source.eq_ignore_ascii_case(destination) => Some(format!(
            "source ({source}) and destination ({destination}) are in different regions; copies will fail with LOCATION_MISMATCH"
        )),
        _ => None,
    }
}

/// List the tables and views in the source dataset as a catalogue.
///
/// # Errors
///
/// Returns [`WarehouseError`] if the dataset cannot be listed.
pub async fn discover_catalogue(
    config: &ReplicationConfig,
    warehouse: &dyn Warehouse,
) -> Result<Catalogue, WarehouseError> {
    let source = config.target().source;
    let objects = warehouse.list_objects(&source).await?;
    tracing::info!(dataset = %source, objects = objects.len(), "Discovered source objects");
    Ok(objects.into_iter().collect())
}
