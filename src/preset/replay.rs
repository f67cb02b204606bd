//! Replaying a preset on the current session.
//!
//! Replay always starts from the original (entry 0) and feeds each step the
//! previous step's output. History is rebuilt as steps succeed; a failure
//! stops the run and keeps what was already applied.

use std::sync::Arc;

use tracing::{info, warn};

use super::types::{Preset, PresetProgress};
use crate::artifact::Artifact;
use crate::edit::{apply_action, EditAction, EditorSession};
use crate::error::EditError;
use crate::model::ModelService;

impl<M: ModelService> EditorSession<M> {
    /// Record the edits leading to the current image as a preset.
    pub fn record_preset(&self, name: &str) -> Result<Preset, EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::UnnamedPreset);
        }
        let preset = Preset::new(name, self.applied_descriptions());
        if preset.is_empty() {
            return Err(EditError::EmptyPreset);
        }
        Ok(preset)
    }

    /// Replay `preset` from the original image, one step at a time.
    ///
    /// `progress` is called before each step. The whole run holds the edit
    /// guard. On failure the error names the failed step and its prompt.
    pub async fn apply_preset<F>(
        &self,
        preset: &Preset,
        mut progress: F,
    ) -> Result<Arc<Artifact>, EditError>
    where
        F: FnMut(PresetProgress) + Send,
    {
        let total = preset.len();
        if total == 0 {
            return Err(EditError::EmptyPreset);
        }
        let (guard, mut input) =
            self.begin_on(&format!("Applying preset '{}'...", preset.name), |h| {
                h.original().map(|e| e.artifact.clone())
            })?;
        let generation = guard.generation();
        info!("Replaying preset '{}' ({} steps)", preset.name, total);

        for (index, step) in preset.actions.iter().enumerate() {
            progress(PresetProgress {
                current: index + 1,
                total,
                prompt: step.prompt.clone(),
            });
            self.set_pending_message(
                generation,
                format!("Applying step {} of {}: {}", index + 1, total, step.prompt),
            );

            let action = EditAction::Adjustment {
                prompt: step.prompt.clone(),
            };
            match apply_action(self.model(), &input, &action).await {
                Ok(result) => {
                    input = self.commit_step(generation, index, result, action.description())?;
                }
                Err(source) => {
                    warn!(
                        "Preset '{}' stopped at step {} of {}",
                        preset.name,
                        index + 1,
                        total
                    );
                    let err = EditError::PresetStep {
                        step: index + 1,
                        total,
                        prompt: step.prompt.clone(),
                        source: Box::new(source),
                    };
                    return self.settle(guard, Err(err), None, |_, done: Arc<Artifact>| done);
                }
            }
        }

        info!("Preset '{}' applied", preset.name);
        self.settle(guard, Ok(input), None, |_, done| done)
    }

    /// Push one successful step. The first step rewinds to the original so
    /// whatever followed it is discarded.
    fn commit_step(
        &self,
        generation: u64,
        index: usize,
        result: Artifact,
        description: String,
    ) -> Result<Arc<Artifact>, EditError> {
        let mut state = self.lock();
        if state.generation != generation {
            warn!("Session changed during preset replay; stopping");
            return Err(EditError::Stale);
        }
        if index == 0 {
            state.history.reset_to_original()?;
        }
        let artifact = Arc::new(result);
        state.history.push(artifact.clone(), Some(description));
        state.clear_transient();
        Ok(artifact)
    }
}
