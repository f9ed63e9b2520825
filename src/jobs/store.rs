//! Job store abstraction and the in-process implementation

use crate::jobs::models::{abandoned_message, JobRecord, JobStatus, JobType};
use crate::utils::config::JobSettings;
use crate::utils::error::{FetcherError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Shared, keyed storage of job records.
///
/// Writes to a terminal record are rejected. Terminal records expire after
/// the configured retention and then read as absent.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a queued record. Replaces an expired record with the same id;
    /// a live one is an `InvalidTransition`.
    async fn create(&self, job_id: &str, job_type: JobType) -> Result<()>;

    /// Mark running with `progress` (0..=100)
    async fn update_progress(&self, job_id: &str, progress: u8) -> Result<()>;

    /// Mark done with the result payload
    async fn complete(&self, job_id: &str, result: Value) -> Result<()>;

    /// Mark failed with an error message
    async fn fail(&self, job_id: &str, error: &str) -> Result<()>;

    /// Current record; `Ok(None)` for unknown or expired ids
    async fn get_status(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// Drop expired records, returning how many went
    async fn purge_expired(&self) -> Result<usize>;
}

/// Job store held in process memory
pub struct MemoryJobStore {
    records: RwLock<HashMap<String, JobRecord>>,
    retention: Duration,
    stale_after: Option<Duration>,
}

impl MemoryJobStore {
    pub fn new(retention: Duration, stale_after: Option<Duration>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            retention,
            stale_after,
        }
    }

    pub fn from_settings(settings: &JobSettings) -> Self {
        Self::new(settings.retention, settings.stale_after)
    }

    /// Apply `mutate` to a live record under the write lock
    async fn modify<F>(&self, job_id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut JobRecord) -> Result<()> + Send,
    {
        let now = Utc::now();
        let mut records = self.records.write().await;

        let expired = match records.get(job_id) {
            Some(record) => record.is_expired(now),
            None => return Err(FetcherError::JobNotFound(job_id.to_string())),
        };
        if expired {
            records.remove(job_id);
            return Err(FetcherError::JobNotFound(job_id.to_string()));
        }

        match records.get_mut(job_id) {
            Some(record) => mutate(record),
            None => Err(FetcherError::JobNotFound(job_id.to_string())),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::from_settings(&JobSettings::default())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job_id: &str, job_type: JobType) -> Result<()> {
        let now = Utc::now();
        let mut records = self.records.write().await;

        if let Some(existing) = records.get(job_id) {
            if !existing.is_expired(now) {
                return Err(FetcherError::InvalidTransition {
                    job_id: job_id.to_string(),
                    from: existing.status.to_string(),
                    to: JobStatus::Queued.to_string(),
                });
            }
        }

        records.insert(job_id.to_string(), JobRecord::new(job_id, job_type, now));
        debug!(job_id = %job_id, job_type = %job_type, "Job created");
        Ok(())
    }

    async fn update_progress(&self, job_id: &str, progress: u8) -> Result<()> {
        self.modify(job_id, |record| record.set_progress(progress, Utc::now()))
            .await?;
        debug!(job_id = %job_id, progress, "Job progress");
        Ok(())
    }

    async fn complete(&self, job_id: &str, result: Value) -> Result<()> {
        let retention = self.retention;
        self.modify(job_id, |record| record.complete(result, Utc::now(), retention))
            .await?;
        info!(job_id = %job_id, "Job done");
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<()> {
        let retention = self.retention;
        self.modify(job_id, |record| record.fail(error, Utc::now(), retention))
            .await?;
        info!(job_id = %job_id, error = %error, "Job failed");
        Ok(())
    }

    async fn get_status(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let now = Utc::now();
        {
            let records = self.records.read().await;
            match records.get(job_id) {
                None => return Ok(None),
                Some(record) if !record.is_expired(now) && !record.is_stale(now, self.stale_after) => {
                    return Ok(Some(record.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired or stale: settle it under the write lock.
        let mut records = self.records.write().await;
        if records.get(job_id).map_or(true, |r| r.is_expired(now)) {
            records.remove(job_id);
            return Ok(None);
        }
        let Some(record) = records.get_mut(job_id) else {
            return Ok(None);
        };
        if let Some(limit) = self.stale_after {
            if record.is_stale(now, Some(limit)) {
                warn!(job_id = %job_id, "Job abandoned");
                record.fail(&abandoned_message(limit), now, self.retention)?;
            }
        }
        Ok(Some(record.clone()))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        let purged = before - records.len();
        if purged > 0 {
            debug!(purged, "Purged expired jobs");
        }
        Ok(purged)
    }
}
