//! Job records and their lifecycle rules

use crate::utils::error::{FetcherError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Kind of asynchronous work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Scrape,
    Thumbnail,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Scrape => "scrape",
            JobType::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scrape" => Ok(JobType::Scrape),
            "thumbnail" => Ok(JobType::Thumbnail),
            other => Err(format!("unknown job type: {}", other)),
        }
    }
}

/// Job status. Moves only queued -> running -> done | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Stored state of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record turns terminal, never before
    pub expires_at: Option<DateTime<Utc>>,
}

/// What polling callers see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

impl JobRecord {
    /// Fresh queued record
    pub fn new(id: impl Into<String>, job_type: JobType, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            job_type,
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Non-terminal and untouched for longer than `stale_after`
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Option<Duration>) -> bool {
        match stale_after {
            Some(limit) if !self.status.is_terminal() => now - self.updated_at > to_chrono(limit),
            _ => false,
        }
    }

    fn ensure_writable(&self, to: JobStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(FetcherError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Enter or stay in `running` with the given progress
    pub fn set_progress(&mut self, progress: u8, now: DateTime<Utc>) -> Result<()> {
        if progress > 100 {
            return Err(FetcherError::InvalidProgress(progress));
        }
        self.ensure_writable(JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.progress = progress;
        self.updated_at = now;
        Ok(())
    }

    /// Terminal success; starts the retention clock
    pub fn complete(&mut self, result: Value, now: DateTime<Utc>, retention: Duration) -> Result<()> {
        self.ensure_writable(JobStatus::Done)?;
        self.status = JobStatus::Done;
        self.progress = 100;
        self.result = Some(result);
        self.error = None;
        self.updated_at = now;
        self.expires_at = Some(now + to_chrono(retention));
        Ok(())
    }

    /// Terminal failure; starts the retention clock
    pub fn fail(&mut self, error: &str, now: DateTime<Utc>, retention: Duration) -> Result<()> {
        self.ensure_writable(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.result = None;
        self.error = Some(error.to_string());
        self.updated_at = now;
        self.expires_at = Some(now + to_chrono(retention));
        Ok(())
    }
}

/// Error recorded for a record that went stale
pub fn abandoned_message(stale_after: Duration) -> String {
    format!(
        "Job abandoned: no progress reported for {}s",
        stale_after.as_secs()
    )
}
