//! Batch processing: one action over many images.

pub mod scheduler;
pub mod types;

pub use scheduler::BatchScheduler;
pub use types::{BatchAction, BatchCounts, BatchJob, BatchSummary, JobId, JobStatus};
