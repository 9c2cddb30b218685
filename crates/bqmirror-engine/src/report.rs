//! Run reporting: live progress lines and the terminal summary.

use std::fmt::Write as _;
use std::time::Duration;

use bqmirror_types::{CatalogueEntry, OperationResult, RunReport, WarehouseError};

use crate::orchestrator::RunPhase;

/// Receives progress events while a run is in flight.
///
/// Called from worker tasks, so implementations must be `Send + Sync`. Under
/// parallel execution events within a phase may arrive in any order.
pub trait ProgressSink: Send + Sync {
    fn phase_started(&self, _phase: RunPhase, _items: usize) {}

    fn item_finished(&self, _result: &OperationResult) {}

    fn retrying(
        &self,
        _entry: &CatalogueEntry,
        _attempt: u32,
        _delay: Duration,
        _error: &WarehouseError,
    ) {
    }
}

/// Discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

/// Prints one line per event to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ProgressSink for ConsoleReporter {
    fn phase_started(&self, phase: RunPhase, items: usize) {
        if let Some(line) = format_phase_line(phase, items) {
            println!("{line}");
        }
    }

    fn item_finished(&self, result: &OperationResult) {
        println!("{}", format_item_line(result));
    }

    fn retrying(
        &self,
        entry: &CatalogueEntry,
        attempt: u32,
        delay: Duration,
        error: &WarehouseError,
    ) {
        println!("{}", format_retry_line(entry, attempt, delay, error));
    }
}

#[must_use]
pub fn format_phase_line(phase: RunPhase, items: usize) -> Option<String> {
    match phase {
        RunPhase::CopyingTables => Some(format!("Copying {items} table(s)")),
        RunPhase::MaterializingViews => Some(format!("Materializing {items} view(s)")),
        RunPhase::Init | RunPhase::Done => None,
    }
}

#[must_use]
pub fn format_item_line(result: &OperationResult) -> String {
    let attempts = if result.attempts == 1 {
        "1 attempt".to_string()
    } else {
        format!("{} attempts", result.attempts)
    };
    match &result.error {
        None => format!(
            "  [ok]    {} ({attempts}, {:.2}s)",
            result.entry, result.duration_secs
        ),
        Some(err) => format!(
            "  [FAIL]  {} ({attempts}): {} {}",
            result.entry, err.kind, err.message
        ),
    }
}

#[must_use]
pub fn format_retry_line(
    entry: &CatalogueEntry,
    attempt: u32,
    delay: Duration,
    error: &WarehouseError,
) -> String {
    format!(
        "  [retry] {entry} attempt {attempt} failed ({}), retrying in {:.1}s",
        error.kind,
        delay.as_secs_f64()
    )
}

/// Terminal summary: per-phase counts, overall status, and every failed item
/// by name and error kind.
#[must_use]
pub fn render_summary(report: &RunReport) -> String {
    let status = match report.status {
        bqmirror_types::RunStatus::AllSucceeded => "ALL_SUCCEEDED",
        bqmirror_types::RunStatus::PartialFailure => "PARTIAL_FAILURE",
    };

    let mut out = String::new();
    let _ = writeln!(out, "Replication finished: {status}");
    let _ = writeln!(
        out,
        "  Tables:   {} succeeded, {} failed",
        report.tables.succeeded, report.tables.failed
    );
    let _ = writeln!(
        out,
        "  Views:    {} succeeded, {} failed",
        report.views.succeeded, report.views.failed
    );
    let _ = writeln!(out, "  Duration: {:.2}s", report.duration_secs);

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "Failed items:");
        for failure in failures {
            let (kind, message) = failure
                .error
                .as_ref()
                .map_or(("UNKNOWN", ""), |e| (e.kind.as_str(), e.message.as_str()));
            let _ = writeln!(out, "  {}: {kind} {message}", failure.entry);
        }
    }
    out
}

/// Pretty-printed JSON form of the report.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn report_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
