use std::sync::Arc;

use tracing::debug;

use super::types::HistoryEntry;
use crate::artifact::Artifact;
use crate::error::HistoryError;

/// Linear undo/redo log over immutable artifacts.
///
/// Entry 0 is always the pristine original of the session. Pushing after an
/// undo discards the redo branch. `cursor` is `None` exactly when the log is
/// empty.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
    max_entries: Option<usize>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the log length. The original is never evicted, so the
    /// effective minimum is 2.
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            max_entries: max_entries.map(|m| m.max(2)),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn current_artifact(&self) -> Option<&Arc<Artifact>> {
        self.current().map(|e| &e.artifact)
    }

    pub fn original(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.entries.len())
    }

    /// Append after the cursor, dropping anything beyond it.
    ///
    /// Returns the entries that were discarded (the old redo branch and any
    /// evicted by the length cap) so derived resources can be released.
    pub fn push(
        &mut self,
        artifact: Arc<Artifact>,
        action_description: Option<String>,
    ) -> Vec<HistoryEntry> {
        let keep = self.cursor.map_or(0, |c| c + 1);
        let mut discarded = self.entries.split_off(keep.min(self.entries.len()));

        self.entries
            .push(HistoryEntry::new(artifact, action_description));

        if let Some(max) = self.max_entries {
            if self.entries.len() > max {
                let overflow = self.entries.len() - max;
                discarded.extend(self.entries.drain(1..1 + overflow));
            }
        }

        self.cursor = Some(self.entries.len() - 1);
        debug!(
            "History push: len={}, cursor={}, discarded={}",
            self.entries.len(),
            self.entries.len() - 1,
            discarded.len()
        );
        discarded
    }

    pub fn undo(&mut self) -> Result<&HistoryEntry, HistoryError> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                Ok(&self.entries[c - 1])
            }
            _ => Err(HistoryError::NothingToUndo),
        }
    }

    pub fn redo(&mut self) -> Result<&HistoryEntry, HistoryError> {
        match self.cursor {
            Some(c) if c + 1 < self.entries.len() => {
                self.cursor = Some(c + 1);
                Ok(&self.entries[c + 1])
            }
            _ => Err(HistoryError::NothingToRedo),
        }
    }

    /// Move the cursor back to the original without truncating.
    ///
    /// Entries after 0 stay reachable through `redo` until the next `push`.
    pub fn reset_to_original(&mut self) -> Result<&HistoryEntry, HistoryError> {
        if self.entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        self.cursor = Some(0);
        Ok(&self.entries[0])
    }

    /// Empty the log, returning everything that was in it.
    pub fn clear(&mut self) -> Vec<HistoryEntry> {
        self.cursor = None;
        std::mem::take(&mut self.entries)
    }

    /// Descriptions of the edits from entry 1 up to the cursor, in order.
    pub fn applied_descriptions(&self) -> Vec<&str> {
        match self.cursor {
            Some(c) => self.entries[1..=c]
                .iter()
                .filter_map(|e| e.action_description.as_deref())
                .collect(),
            None => Vec::new(),
        }
    }
}
