//! BigQuery REST v2 implementation of [`Warehouse`].
//!
//! Copy and query operations are submitted as jobs via `jobs.insert` and
//! polled with `jobs.get` until they reach `DONE`, so callers see a single
//! blocking call per operation. Both jobs use `WRITE_TRUNCATE`, which makes
//! every operation a full overwrite.

mod classify;
mod wire;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bqmirror_types::{CatalogueEntry, DatasetRef, TableRef, WarehouseError, WarehouseErrorKind};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth::AccessTokenSource;
use crate::backend::{Result, Warehouse};

use classify::{classify_http, classify_job_error, classify_transport};
use wire::{
    CopyConfiguration, Dataset, Job, JobConfiguration, JobInsert, JobReference,
    QueryConfiguration, TableList,
};

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

const WRITE_TRUNCATE: &str = "WRITE_TRUNCATE";
const CREATE_IF_NEEDED: &str = "CREATE_IF_NEEDED";
const JOB_STATE_DONE: &str = "DONE";
const LIST_PAGE_SIZE: u32 = 1000;

/// Connection and job-polling settings for [`BigQueryWarehouse`].
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// REST root, overridable for emulators and tests.
    pub endpoint: String,
    /// Project that runs (and is billed for) copy and query jobs.
    pub job_project: String,
    /// Region for query jobs. `None` lets BigQuery infer it.
    pub location: Option<String>,
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    pub request_timeout: Duration,
}

impl BigQueryConfig {
    #[must_use]
    pub fn new(job_project: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            job_project: job_project.into(),
            location: None,
            poll_interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }
}

/// BigQuery-backed warehouse client.
pub struct BigQueryWarehouse {
    config: BigQueryConfig,
    tokens: Arc<dyn AccessTokenSource>,
    client: reqwest::Client,
}

impl std::fmt::Debug for BigQueryWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryWarehouse")
            .field("config", &self.config)
            .field("tokens", &"<AccessTokenSource>")
            .finish_non_exhaustive()
    }
}

impl BigQueryWarehouse {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: BigQueryConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WarehouseError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            config,
            tokens,
            client,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BigQueryConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| {
                WarehouseError::unknown(format!("Failed to parse BigQuery response: {e}"))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify_http(status, &body))
        }
    }

    fn dataset_url(&self, dataset: &DatasetRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}",
            self.config.endpoint, dataset.project, dataset.dataset
        )
    }

    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<Dataset> {
        self.send(self.client.get(self.dataset_url(dataset))).await
    }

    async fn get_job(&self, reference: &JobReference) -> Result<Job> {
        let url = format!(
            "{}/projects/{}/jobs/{}",
            self.config.endpoint, reference.project_id, reference.job_id
        );
        let mut request = self.client.get(url);
        if let Some(location) = &reference.location {
            request = request.query(&[("location", location)]);
        }
        self.send(request).await
    }

    /// Insert a job and poll it until BigQuery reports `DONE`.
    async fn run_job(
        &self,
        prefix: &str,
        location: Option<&str>,
        configuration: JobConfiguration,
    ) -> Result<()> {
        let job_id = format!("bqmirror_{prefix}_{}", Uuid::new_v4().simple());
        let insert = JobInsert {
            job_reference: JobReference {
                project_id: self.config.job_project.clone(),
                job_id: job_id.clone(),
                location: location.map(str::to_string),
            },
            configuration,
        };
        let url = format!(
            "{}/projects/{}/jobs",
            self.config.endpoint, self.config.job_project
        );

        let mut job: Job = self.send(self.client.post(url).json(&insert)).await?;
        tracing::debug!(job_id = %job_id, location, "BigQuery job submitted");

        let deadline = Instant::now() + self.config.job_timeout;
        loop {
            if job.status.state == JOB_STATE_DONE {
                return match job.status.error_result {
                    Some(err) => Err(classify_job_error(&err)),
                    None => {
                        tracing::debug!(job_id = %job_id, "BigQuery job done");
                        Ok(())
                    }
                };
            }
            if Instant::now() >= deadline {
                return Err(WarehouseError::unknown(format!(
                    "Job {job_id} did not finish within {}s",
                    self.config.job_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.config.poll_interval).await;
            // The job is still running; only its final state is reported.
            let polled = self.get_job(&job.job_reference).await;
            match polled {
                Ok(polled) => job = polled,
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        job_id = %job_id,
                        error = %err,
                        "Polling BigQuery job failed, will poll again"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn copy_table(
        &self,
        source: &TableRef,
        destination: &TableRef,
        location: Option<&str>,
    ) -> Result<()> {
        let configuration = JobConfiguration {
            copy: Some(CopyConfiguration {
                source_table: source.into(),
                destination_table: destination.into(),
                write_disposition: WRITE_TRUNCATE,
                create_disposition: CREATE_IF_NEEDED,
            }),
            query: None,
        };
        self.run_job("copy", location, configuration).await
    }

    async fn materialize_view(&self, view: &TableRef, destination: &TableRef) -> Result<()> {
        let configuration = JobConfiguration {
            copy: None,
            query: Some(QueryConfiguration {
                query: format!("SELECT * FROM {}", view.quoted()),
                use_legacy_sql: false,
                destination_table: destination.into(),
                write_disposition: WRITE_TRUNCATE,
                create_disposition: CREATE_IF_NEEDED,
            }),
        };
        self.run_job("query", self.config.location.as_deref(), configuration)
            .await
    }

    async fn dataset_location(&self, dataset: &DatasetRef) -> Result<String> {
        self.get_dataset(dataset).await?.location.ok_or_else(|| {
            WarehouseError::unknown(format!("Dataset {dataset} has no location"))
        })
    }

    async fn ensure_dataset(&self, dataset: &DatasetRef, location: &str) -> Result<()> {
        match self.get_dataset(dataset).await {
            Ok(existing) => {
                let actual = existing.location.unwrap_or_default();
                if actual.eq_ignore_ascii_case(location) {
                    tracing::info!(dataset = %dataset, location, "Found destination dataset");
                    Ok(())
                } else {
                    Err(WarehouseError::location_mismatch(format!(
                        "Destination dataset {dataset} is in location {actual} but source dataset is in {location}"
                    )))
                }
            }
            Err(err) if err.kind == WarehouseErrorKind::NotFound => {
                tracing::info!(dataset = %dataset, location, "Destination dataset not found; creating it");
                let body = Dataset {
                    dataset_reference: dataset.into(),
                    location: Some(location.to_string()),
                };
                let url = format!(
                    "{}/projects/{}/datasets",
                    self.config.endpoint, dataset.project
                );
                let _created: Dataset = self.send(self.client.post(url).json(&body)).await?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn list_objects(&self, dataset: &DatasetRef) -> Result<Vec<CatalogueEntry>> {
        let url = format!("{}/tables", self.dataset_url(dataset));
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("maxResults", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: TableList = self.send(request).await?;

            for item in page.tables {
                let name = item.table_reference.table_id;
                match item.kind.as_str() {
                    "TABLE" | "SNAPSHOT" => entries.push(CatalogueEntry::table(name)),
                    "VIEW" | "MATERIALIZED_VIEW" => entries.push(CatalogueEntry::view(name)),
                    other => tracing::debug!(table = %name, kind = other, "Skipping unsupported object"),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
