//! Queue-facing job execution
//!
//! A handler turns one job request into a terminal outcome and records it in
//! the job store. It never lets a job failure escape: absence, errors, panics
//! and deadline overruns all end as a `failed` record.

use crate::downloader::ThumbnailPipeline;
use crate::extractor::{OutputFormat, ScrapeResult, SearchExtractor};
use crate::jobs::models::JobType;
use crate::jobs::store::JobStore;
use crate::utils::error::FetcherError;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Progress reported when a job is picked up
pub const PROGRESS_STARTED: u8 = 10;

/// Inclusive bounds for `max_results` / `max_thumbnails`
pub const MIN_ITEMS: usize = 1;
pub const MAX_ITEMS: usize = 50;

fn default_max_items() -> usize {
    20
}

fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A job as delivered by the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default = "new_job_id")]
    pub job_id: String,
    #[serde(flatten)]
    pub params: JobParams,
}

/// Parameters per job type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobParams {
    Scrape {
        query: String,
        #[serde(default = "default_max_items")]
        max_results: usize,
        #[serde(default)]
        format: OutputFormat,
    },
    Thumbnail {
        query: String,
        #[serde(default = "default_max_items")]
        max_thumbnails: usize,
    },
}

impl JobParams {
    pub fn job_type(&self) -> JobType {
        match self {
            JobParams::Scrape { .. } => JobType::Scrape,
            JobParams::Thumbnail { .. } => JobType::Thumbnail,
        }
    }

    pub fn query(&self) -> &str {
        match self {
            JobParams::Scrape { query, .. } | JobParams::Thumbnail { query, .. } => query,
        }
    }

    /// Reject requests outside the accepted bounds
    pub fn validate(&self) -> Result<(), String> {
        let (name, value) = match self {
            JobParams::Scrape { max_results, .. } => ("max_results", *max_results),
            JobParams::Thumbnail { max_thumbnails, .. } => ("max_thumbnails", *max_thumbnails),
        };
        if self.query().trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if !(MIN_ITEMS..=MAX_ITEMS).contains(&value) {
            return Err(format!(
                "{} must be between {} and {}, got {}",
                name, MIN_ITEMS, MAX_ITEMS, value
            ));
        }
        Ok(())
    }
}

/// Terminal outcome of one job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(Value),
    Failed(String),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

#[derive(Serialize)]
struct ScrapeJobResult<'a> {
    success: bool,
    #[serde(flatten)]
    result: &'a ScrapeResult,
}

/// Runs scrape and thumbnail jobs against a shared job store
pub struct JobHandler {
    store: Arc<dyn JobStore>,
    extractor: Arc<dyn SearchExtractor>,
    thumbnails: Arc<ThumbnailPipeline>,
    deadline: Option<Duration>,
}

impl JobHandler {
    pub fn new(
        store: Arc<dyn JobStore>,
        extractor: Arc<dyn SearchExtractor>,
        thumbnails: Arc<ThumbnailPipeline>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            store,
            extractor,
            thumbnails,
            deadline,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Execute `params` and produce the terminal outcome, without touching
    /// the store
    pub async fn run(&self, params: &JobParams) -> JobOutcome {
        if let Err(reason) = params.validate() {
            return JobOutcome::Failed(reason);
        }

        match params {
            JobParams::Scrape {
                query,
                max_results,
                format,
            } => match self.extractor.scrape(query, *max_results, *format).await {
                Some(result) => to_outcome(&ScrapeJobResult {
                    success: true,
                    result: &result,
                }),
                None => JobOutcome::Failed(format!("YouTube scrape failed for query: {}", query)),
            },
            JobParams::Thumbnail {
                query,
                max_thumbnails,
            } => match self.thumbnails.fetch(query, *max_thumbnails).await {
                Some(batch) => to_outcome(&batch),
                None => JobOutcome::Failed(format!("Thumbnail fetch failed for query: {}", query)),
            },
        }
    }

    /// Process one delivered job: mark it started, run it under the deadline
    /// and record the outcome
    pub async fn handle(&self, request: &JobRequest) -> JobOutcome {
        let job_id = request.job_id.as_str();
        let job_type = request.params.job_type();
        info!(job_id = %job_id, job_type = %job_type, query = %request.params.query(), "Job started");

        if let Err(e) = self.store.update_progress(job_id, PROGRESS_STARTED).await {
            error!(job_id = %job_id, error = %e, "Failed to mark job running");
            let outcome = JobOutcome::Failed(e.to_string());
            self.record(job_id, &outcome).await;
            return outcome;
        }

        let work = AssertUnwindSafe(self.run(&request.params)).catch_unwind();
        let finished = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(finished) => finished,
                Err(_) => {
                    warn!(job_id = %job_id, deadline = ?limit, "Job deadline exceeded");
                    Ok(JobOutcome::Failed(FetcherError::DeadlineExceeded(limit).to_string()))
                }
            },
            None => work.await,
        };

        let outcome = finished.unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            error!(job_id = %job_id, panic = %message, "Job panicked");
            JobOutcome::Failed(format!("Job panicked: {}", message))
        });

        self.record(job_id, &outcome).await;
        outcome
    }

    async fn record(&self, job_id: &str, outcome: &JobOutcome) {
        let written = match outcome {
            JobOutcome::Completed(result) => self.store.complete(job_id, result.clone()).await,
            JobOutcome::Failed(message) => self.store.fail(job_id, message).await,
        };
        if let Err(e) = written {
            error!(job_id = %job_id, error = %e, "Failed to record job outcome");
        }
    }
}

fn to_outcome<T: Serialize>(payload: &T) -> JobOutcome {
    match serde_json::to_value(payload) {
        Ok(value) => JobOutcome::Completed(value),
        Err(e) => JobOutcome::Failed(FetcherError::from(e).to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
