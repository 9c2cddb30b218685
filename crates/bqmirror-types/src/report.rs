//! Per-item outcomes and the aggregate run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalogue::{CatalogueEntry, EntryKind};
use crate::error::WarehouseError;

/// Outcome of one catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
}

/// Result of replicating a single catalogue entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub entry: CatalogueEntry,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WarehouseError>,
    /// Number of warehouse calls made, including retries.
    pub attempts: u32,
    pub duration_secs: f64,
}

impl OperationResult {
    #[must_use]
    pub fn success(entry: CatalogueEntry, attempts: u32, duration_secs: f64) -> Self {
        Self {
            entry,
            outcome: Outcome::Success,
            error: None,
            attempts,
            duration_secs,
        }
    }

    #[must_use]
    pub fn failure(
        entry: CatalogueEntry,
        error: WarehouseError,
        attempts: u32,
        duration_secs: f64,
    ) -> Self {
        Self {
            entry,
            outcome: Outcome::Failure,
            error: Some(error),
            attempts,
            duration_secs,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    AllSucceeded,
    PartialFailure,
}

/// Success/failure counts for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl PhaseSummary {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Aggregate report for a full run, in catalogue order (tables, then views).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub status: RunStatus,
    pub tables: PhaseSummary,
    pub views: PhaseSummary,
    pub results: Vec<OperationResult>,
}

impl RunReport {
    /// Finalize a report from the ordered per-item results.
    #[must_use]
    pub fn new(results: Vec<OperationResult>, started_at: DateTime<Utc>, duration_secs: f64) -> Self {
        let mut tables = PhaseSummary::default();
        let mut views = PhaseSummary::default();
        for result in &results {
            let summary = match result.entry.kind {
                EntryKind::Table => &mut tables,
                EntryKind::View => &mut views,
            };
            if result.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        let status = if results.iter().all(OperationResult::is_success) {
            RunStatus::AllSucceeded
        } else {
            RunStatus::PartialFailure
        };

        Self {
            started_at,
            duration_secs,
            status,
            tables,
            views,
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::AllSucceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(results: Vec<OperationResult>) -> RunReport {
        RunReport::new(results, Utc::now(), 0.0)
    }

    #[test]
    fn all_success_status() {
        let r = report(vec![
            OperationResult::success(CatalogueEntry::table("a"), 1, 0.1),
            OperationResult::success(CatalogueEntry::view("b"), 1, 0.1),
        ]);
        assert_eq!(r.status, RunStatus::AllSucceeded);
        assert_eq!(r.tables, PhaseSummary { succeeded: 1, failed: 0 });
        assert_eq!(r.views, PhaseSummary { succeeded: 1, failed: 0 });
        assert_eq!(r.failures().count(), 0);
    }

    #[test]
    fn any_failure_is_partial() {
        let r = report(vec![
            OperationResult::success(CatalogueEntry::table("a"), 1, 0.1),
            OperationResult::failure(
                CatalogueEntry::view("b"),
                WarehouseError::permission_denied("denied"),
                1,
                0.1,
            ),
        ]);
        assert_eq!(r.status, RunStatus::PartialFailure);
        assert_eq!(r.views.failed, 1);
        assert_eq!(r.views.attempted(), 1);
        let failed: Vec<_> = r.failures().map(|f| f.entry.name.as_str()).collect();
        assert_eq!(failed, vec!["b"]);
    }

    #[test]
    fn report_json_shape() {
        let r = report(vec![OperationResult::failure(
            CatalogueEntry::table("users"),
            WarehouseError::not_found("missing"),
            1,
            0.0,
        )]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "PARTIAL_FAILURE");
        assert_eq!(json["results"][0]["outcome"], "FAILURE");
        assert_eq!(json["results"][0]["error"]["kind"], "NOT_FOUND");
    }
}
