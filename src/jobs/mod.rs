//! Asynchronous job records, storage and execution

pub mod handler;
pub mod models;
pub mod store;
pub mod worker;

// Re-export for convenience
pub use handler::{JobHandler, JobOutcome, JobParams, JobRequest};
pub use models::{JobRecord, JobStatus, JobStatusView, JobType};
pub use store::{JobStore, MemoryJobStore};
pub use worker::{run_worker, WorkerStats};
