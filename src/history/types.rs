use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::artifact::Artifact;

/// One step of the edit history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub artifact: Arc<Artifact>,
    /// Label of the edit that produced this artifact; `None` for the original.
    pub action_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(artifact: Arc<Artifact>, action_description: Option<String>) -> Self {
        Self {
            artifact,
            action_description,
            created_at: Utc::now(),
        }
    }
}
