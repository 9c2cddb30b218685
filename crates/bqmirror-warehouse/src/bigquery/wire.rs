//! BigQuery REST v2 request/response bodies (the subset bqmirror uses).

use bqmirror_types::{DatasetRef, TableRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl From<&TableRef> for TableReference {
    fn from(r: &TableRef) -> Self {
        Self {
            project_id: r.project.clone(),
            dataset_id: r.dataset.clone(),
            table_id: r.table.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DatasetReference {
    pub project_id: String,
    pub dataset_id: String,
}

impl From<&DatasetRef> for DatasetReference {
    fn from(r: &DatasetRef) -> Self {
        Self {
            project_id: r.project.clone(),
            dataset_id: r.dataset.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// `jobs.insert` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobInsert {
    pub job_reference: JobReference,
    pub configuration: JobConfiguration,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfiguration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CopyConfiguration {
    pub source_table: TableReference,
    pub destination_table: TableReference,
    pub write_disposition: &'static str,
    pub create_disposition: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryConfiguration {
    pub query: String,
    pub use_legacy_sql: bool,
    pub destination_table: TableReference,
    pub write_disposition: &'static str,
    pub create_disposition: &'static str,
}

/// Job resource as returned by `jobs.insert` and `jobs.get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Job {
    pub job_reference: JobReference,
    #[serde(default)]
    pub status: JobStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub error_result: Option<ErrorProto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

/// Google API error envelope: `{"error": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Dataset {
    pub dataset_reference: DatasetReference,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableList {
    #[serde(default)]
    pub tables: Vec<TableListItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableListItem {
    pub table_reference: TableReference,
    #[serde(rename = "type", default)]
    pub kind: String,
}
