use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::artifact::Artifact;
use crate::edit::EditAction;
use crate::error::EditError;

/// Identifier of a job within one batch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub(crate) u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

/// One image in a batch. Only the scheduler mutates jobs.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: JobId,
    pub source: Arc<Artifact>,
    pub result: Option<Arc<Artifact>>,
    pub status: JobStatus,
    pub error_message: Option<String>,
}

impl BatchJob {
    pub(crate) fn new(id: JobId, source: Artifact) -> Self {
        Self {
            id,
            source: Arc::new(source),
            result: None,
            status: JobStatus::Pending,
            error_message: None,
        }
    }

    /// Whether a `process` run picks this job up.
    pub fn is_runnable(&self) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Error)
    }
}

/// Edits that make sense without a per-image hotspot, mask or second image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchAction {
    Filter { prompt: String },
    Adjustment { prompt: String },
    RemoveBackground,
    Upscale { factor: u32 },
}

impl From<BatchAction> for EditAction {
    fn from(action: BatchAction) -> Self {
        match action {
            BatchAction::Filter { prompt } => EditAction::Filter { prompt },
            BatchAction::Adjustment { prompt } => EditAction::Adjustment { prompt },
            BatchAction::RemoveBackground => EditAction::RemoveBackground,
            BatchAction::Upscale { factor } => EditAction::Upscale { factor },
        }
    }
}

impl TryFrom<EditAction> for BatchAction {
    type Error = EditError;

    fn try_from(action: EditAction) -> Result<Self, Self::Error> {
        match action {
            EditAction::Filter { prompt } => Ok(Self::Filter { prompt }),
            EditAction::Adjustment { prompt } => Ok(Self::Adjustment { prompt }),
            EditAction::RemoveBackground => Ok(Self::RemoveBackground),
            EditAction::Upscale { factor } => Ok(Self::Upscale { factor }),
            other => Err(EditError::UnsupportedInBatch(other.kind().to_string())),
        }
    }
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

impl BatchCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.done + self.error
    }
}

/// Outcome of one `process` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Jobs picked up by this run
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}
