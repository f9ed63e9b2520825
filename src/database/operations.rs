//! SQLite-backed job store
//!
//! Every write is a single conditional `UPDATE`, so a record moves between
//! states atomically and a terminal record is never overwritten, even with
//! several processes sharing the database.

use crate::jobs::models::{abandoned_message, to_chrono, JobRecord, JobStatus, JobType};
use crate::jobs::store::JobStore;
use crate::utils::config::JobSettings;
use crate::utils::error::{FetcherError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::time::Duration;
use tracing::{debug, info, warn};

const LIVE_STATUSES: &str = "('queued', 'running')";

/// Job store shared through a SQLite database
pub struct SqliteJobStore {
    pool: Pool<Sqlite>,
    retention: Duration,
    stale_after: Option<Duration>,
}

impl SqliteJobStore {
    pub fn new(pool: Pool<Sqlite>, retention: Duration, stale_after: Option<Duration>) -> Self {
        Self {
            pool,
            retention,
            stale_after,
        }
    }

    /// Open the database named by `settings.database_url`
    pub async fn connect(database_url: &str, settings: &JobSettings) -> Result<Self> {
        let pool = super::schema::initialize_database(database_url).await?;
        Ok(Self::new(pool, settings.retention, settings.stale_after))
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> i64 {
        (now + to_chrono(self.retention)).timestamp_millis()
    }

    /// Explain why a conditional write touched no row
    async fn rejection(&self, job_id: &str, to: JobStatus) -> FetcherError {
        let now = Utc::now().timestamp_millis();
        let row = sqlx::query(
            "SELECT status FROM jobs WHERE id = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(job_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some(row)) => match row.try_get::<String, _>("status") {
                Ok(from) => FetcherError::InvalidTransition {
                    job_id: job_id.to_string(),
                    from,
                    to: to.to_string(),
                },
                Err(e) => e.into(),
            },
            Ok(None) => FetcherError::JobNotFound(job_id.to_string()),
            Err(e) => e.into(),
        }
    }

    /// Fail a non-terminal record untouched since `cutoff`
    async fn abandon_if_stale(&self, job_id: &str, limit: Duration) -> Result<bool> {
        let now = Utc::now();
        let cutoff = (now - to_chrono(limit)).timestamp_millis();
        let updated = sqlx::query(&format!(
            "UPDATE jobs SET status = 'failed', progress = 0, result = NULL, error = ?, \
             updated_at = ?, expires_at = ? \
             WHERE id = ? AND status IN {} AND updated_at < ?",
            LIVE_STATUSES
        ))
        .bind(abandoned_message(limit))
        .bind(now.timestamp_millis())
        .bind(self.expiry_from(now))
        .bind(job_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job_id: &str, job_type: JobType) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        // Only an expired record may be replaced.
        let inserted = sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, status, progress, result, error, created_at, updated_at, expires_at)
            VALUES (?, ?, 'queued', 0, NULL, NULL, ?, ?, NULL)
            ON CONFLICT(id) DO UPDATE SET
                job_type = excluded.job_type,
                status = 'queued',
                progress = 0,
                result = NULL,
                error = NULL,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                expires_at = NULL
            WHERE jobs.expires_at IS NOT NULL AND jobs.expires_at <= excluded.updated_at
            "#,
        )
        .bind(job_id)
        .bind(job_type.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(self.rejection(job_id, JobStatus::Queued).await);
        }
        debug!("Created job record: {}", job_id);
        Ok(())
    }

    async fn update_progress(&self, job_id: &str, progress: u8) -> Result<()> {
        if progress > 100 {
            return Err(FetcherError::InvalidProgress(progress));
        }
        let updated = sqlx::query(&format!(
            "UPDATE jobs SET status = 'running', progress = ?, updated_at = ? \
             WHERE id = ? AND status IN {}",
            LIVE_STATUSES
        ))
        .bind(progress as i64)
        .bind(Utc::now().timestamp_millis())
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(self.rejection(job_id, JobStatus::Running).await);
        }
        debug!("Job {} progress: {}%", job_id, progress);
        Ok(())
    }

    async fn complete(&self, job_id: &str, result: Value) -> Result<()> {
        let now = Utc::now();
        let payload = serde_json::to_string(&result)?;
        let updated = sqlx::query(&format!(
            "UPDATE jobs SET status = 'done', progress = 100, result = ?, error = NULL, \
             updated_at = ?, expires_at = ? \
             WHERE id = ? AND status IN {}",
            LIVE_STATUSES
        ))
        .bind(payload)
        .bind(now.timestamp_millis())
        .bind(self.expiry_from(now))
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(self.rejection(job_id, JobStatus::Done).await);
        }
        info!(job_id = %job_id, "Job done");
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<()> {
        let now = Utc::now();
        let updated = sqlx::query(&format!(
            "UPDATE jobs SET status = 'failed', progress = 0, result = NULL, error = ?, \
             updated_at = ?, expires_at = ? \
             WHERE id = ? AND status IN {}",
            LIVE_STATUSES
        ))
        .bind(error)
        .bind(now.timestamp_millis())
        .bind(self.expiry_from(now))
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(self.rejection(job_id, JobStatus::Failed).await);
        }
        info!(job_id = %job_id, error = %error, "Job failed");
        Ok(())
    }

    async fn get_status(&self, job_id: &str) -> Result<Option<JobRecord>> {
        if let Some(limit) = self.stale_after {
            if self.abandon_if_stale(job_id, limit).await? {
                warn!(job_id = %job_id, "Job abandoned");
            }
        }

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = row_into_job_record(row)?;

        if record.is_expired(Utc::now()) {
            sqlx::query("DELETE FROM jobs WHERE id = ? AND expires_at IS NOT NULL AND expires_at <= ?")
                .bind(job_id)
                .bind(Utc::now().timestamp_millis())
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let purged = sqlx::query("DELETE FROM jobs WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if purged > 0 {
            debug!("Purged {} expired job records", purged);
        }
        Ok(purged as usize)
    }
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| sqlx::Error::Protocol(format!("timestamp out of range: {}", millis)).into())
}

fn row_into_job_record(row: SqliteRow) -> Result<JobRecord> {
    let job_type: String = row.try_get("job_type")?;
    let status: String = row.try_get("status")?;
    let progress: i64 = row.try_get("progress")?;
    let result: Option<String> = row.try_get("result")?;
    let expires_at: Option<i64> = row.try_get("expires_at")?;

    Ok(JobRecord {
        id: row.try_get("id")?,
        job_type: job_type.parse().map_err(sqlx::Error::Protocol)?,
        status: status.parse().map_err(sqlx::Error::Protocol)?,
        progress: progress.clamp(0, 100) as u8,
        result: result.as_deref().map(serde_json::from_str).transpose()?,
        error: row.try_get("error")?,
        created_at: timestamp(row.try_get("created_at")?)?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
        expires_at: expires_at.map(timestamp).transpose()?,
    })
}
