//! Recently used prompts, most recent first.

use std::sync::Arc;

use tracing::debug;

use super::{keys, load_json, save_json, KeyValueStore};
use crate::config::{LibraryConfig, DEFAULT_PROMPT_HISTORY_LIMIT};
use crate::error::StoreError;

pub struct PromptHistory {
    store: Arc<dyn KeyValueStore>,
    limit: usize,
}

impl PromptHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limit(store, DEFAULT_PROMPT_HISTORY_LIMIT)
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, config: &LibraryConfig) -> Self {
        Self::with_limit(store, config.prompt_history_limit)
    }

    pub fn with_limit(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(load_json(self.store.as_ref(), keys::PROMPT_HISTORY)?.unwrap_or_default())
    }

    /// Record a prompt: trimmed, moved to the front if already present,
    /// oldest entries dropped past the limit. Blank prompts are ignored.
    pub fn record(&self, prompt: &str) -> Result<Vec<String>, StoreError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return self.list();
        }

        let mut prompts = self.list()?;
        prompts.retain(|p| p != prompt);
        prompts.insert(0, prompt.to_string());
        prompts.truncate(self.limit);

        save_json(self.store.as_ref(), keys::PROMPT_HISTORY, &prompts)?;
        debug!("Recorded prompt, {} in history", prompts.len());
        Ok(prompts)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(keys::PROMPT_HISTORY)
    }
}
