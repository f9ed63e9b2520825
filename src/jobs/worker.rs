//! Line-delimited job intake
//!
//! Reads one JSON job request per line and processes them in order. Stands
//! in for a queue consumer: each request is delivered once to one handler.

use crate::jobs::handler::{JobHandler, JobRequest};
use crate::utils::error::{FetcherError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Totals for one worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Consume requests from `reader` until EOF
pub async fn run_worker<R>(handler: &JobHandler, reader: R) -> Result<WorkerStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = WorkerStats::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: JobRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                // One bad line must not stop the worker.
                warn!(error = %e, "Skipping malformed job request");
                stats.skipped += 1;
                continue;
            }
        };

        match handler
            .store()
            .create(&request.job_id, request.params.job_type())
            .await
        {
            Ok(()) => {}
            // Already enqueued by the submitting side.
            Err(FetcherError::InvalidTransition { from, .. }) if from == "queued" => {
                debug!(job_id = %request.job_id, "Job record already exists");
            }
            Err(e) => {
                warn!(job_id = %request.job_id, error = %e, "Skipping job that cannot be started");
                stats.skipped += 1;
                continue;
            }
        }

        if handler.handle(&request).await.is_completed() {
            stats.completed += 1;
        } else {
            stats.failed += 1;
        }
    }

    info!(
        completed = stats.completed,
        failed = stats.failed,
        skipped = stats.skipped,
        "Worker input exhausted"
    );
    Ok(stats)
}
