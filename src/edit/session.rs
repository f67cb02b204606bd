//! The editing session: the only owner of the history, the transient
//! hotspot/selection and the request status.
//!
//! Every edit goes through one in-flight guard. A generation counter is
//! bumped whenever the session is started over or exited; a result that
//! comes back under an older generation is dropped with [`EditError::Stale`]
//! instead of being pushed onto a history it no longer belongs to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use super::action::{apply_action, EditAction};
use crate::artifact::{extension_for_mime, Artifact};
use crate::config::EditorConfig;
use crate::error::{EditError, HistoryError};
use crate::history::{EditHistory, HistoryEntry};
use crate::model::prompts::{
    build_reverse_prompt_prompt, build_suggestions_prompt, build_variation_prompt,
};
use crate::model::response::{parse_reverse_prompt, parse_suggestions};
use crate::model::{ModelService, Suggestion, TransformExtras};
use crate::raster::animation::assemble_gif;
use crate::raster::compose::crop_artifact;
use crate::raster::geometry::{hotspot_from_display, Hotspot, Point, Rect, Size};
use crate::raster::mask::{rasterize_mask, Mask};

/// Request lifecycle shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditStatus {
    #[default]
    Idle,
    Pending {
        message: String,
    },
    Error {
        message: String,
    },
}

impl EditStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// What `retry` re-runs.
#[derive(Debug, Clone)]
pub(crate) enum FailedCall {
    Edit(EditAction),
    Generate(String),
}

pub(crate) struct SessionState {
    pub(crate) history: EditHistory,
    pub(crate) status: EditStatus,
    pub(crate) generation: u64,
    hotspot: Option<Hotspot>,
    selection: Option<Mask>,
    last_failed: Option<FailedCall>,
    max_history: Option<usize>,
    pixel_ratio: f64,
}

impl SessionState {
    pub(crate) fn clear_transient(&mut self) {
        self.hotspot = None;
        self.selection = None;
    }

    fn ensure_idle(&self, operation: &str) -> Result<(), EditError> {
        if self.status.is_pending() {
            warn!("Rejecting '{}': another edit is in flight", operation);
            return Err(EditError::Busy);
        }
        Ok(())
    }

    /// Throw away the current session and open a new one on `original`.
    fn restart(&mut self, original: Artifact) -> Arc<Artifact> {
        self.generation += 1;
        let released = self.history.clear();
        self.history = EditHistory::with_max_entries(self.max_history);

        let original = Arc::new(original);
        self.history.push(original.clone(), None);
        self.status = EditStatus::Idle;
        self.last_failed = None;
        self.clear_transient();

        info!(
            "Started editing session {} on {} ({} artifacts released)",
            self.generation,
            original.filename(),
            released.len()
        );
        original
    }
}

/// Ownership of the edit guard for one call.
///
/// Released by `settle`. If the call's future is dropped first, the drop
/// puts a session that is still pending under the same generation back to
/// Idle so the next edit is not refused.
pub(crate) struct PendingGuard {
    state: Arc<Mutex<SessionState>>,
    generation: u64,
    settled: bool,
}

impl PendingGuard {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation && state.status.is_pending() {
            warn!("Request in session {} was cancelled", self.generation);
            state.status = EditStatus::Idle;
        }
    }
}

pub struct EditorSession<M> {
    model: Arc<M>,
    state: Arc<Mutex<SessionState>>,
}

impl<M> Clone for EditorSession<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            state: Arc::clone(&self.state),
        }
    }
}

impl<M: ModelService> EditorSession<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self::with_config(model, &EditorConfig::default())
    }

    pub fn with_config(model: Arc<M>, config: &EditorConfig) -> Self {
        let state = SessionState {
            history: EditHistory::with_max_entries(config.max_history),
            status: EditStatus::Idle,
            generation: 0,
            hotspot: None,
            selection: None,
            last_failed: None,
            max_history: config.max_history,
            pixel_ratio: config.pixel_ratio,
        };
        Self {
            model,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- Lifecycle ----

    /// Open a session on an uploaded image. Any edit still in flight for
    /// the previous session will be discarded when it returns.
    pub fn start(&self, original: Artifact) -> Arc<Artifact> {
        self.lock().restart(original)
    }

    /// Leave the editor: history is cleared and late results are ignored.
    pub fn exit(&self) {
        let mut state = self.lock();
        state.generation += 1;
        let released = state.history.clear();
        state.status = EditStatus::Idle;
        state.last_failed = None;
        state.clear_transient();
        info!("Exited editor, released {} artifacts", released.len());
    }

    /// Text-to-image: on success the generated image becomes the original
    /// of a fresh session.
    pub async fn generate(&self, prompt: &str) -> Result<Arc<Artifact>, EditError> {
        let guard = self.begin_detached("Generating image...")?;
        let outcome = self
            .model
            .generate_image(prompt)
            .await
            .map_err(EditError::from);
        self.settle(
            guard,
            outcome,
            Some(FailedCall::Generate(prompt.to_string())),
            SessionState::restart,
        )
    }

    // ---- Read access ----

    pub fn status(&self) -> EditStatus {
        self.lock().status.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.lock().history.is_empty()
    }

    pub fn current(&self) -> Option<Arc<Artifact>> {
        self.lock().history.current_artifact().cloned()
    }

    pub fn original(&self) -> Option<Arc<Artifact>> {
        self.lock().history.original().map(|e| e.artifact.clone())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.lock().history.cursor()
    }

    pub fn can_undo(&self) -> bool {
        self.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().history.can_redo()
    }

    /// Copy of the history; entries share their artifacts with the session.
    pub fn history(&self) -> EditHistory {
        self.lock().history.clone()
    }

    /// Descriptions of the edits leading to the current image, oldest first.
    pub fn applied_descriptions(&self) -> Vec<String> {
        self.lock()
            .history
            .applied_descriptions()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn hotspot(&self) -> Option<Hotspot> {
        self.lock().hotspot
    }

    pub fn has_selection(&self) -> bool {
        self.lock().selection.is_some()
    }

    // ---- Navigation ----

    pub fn undo(&self) -> Result<Arc<Artifact>, EditError> {
        self.navigate("undo", EditHistory::undo)
    }

    pub fn redo(&self) -> Result<Arc<Artifact>, EditError> {
        self.navigate("redo", EditHistory::redo)
    }

    /// Show the original again. Later entries stay reachable with `redo`
    /// until the next edit.
    pub fn reset(&self) -> Result<Arc<Artifact>, EditError> {
        self.navigate("reset", EditHistory::reset_to_original)
    }

    fn navigate(
        &self,
        operation: &str,
        step: impl FnOnce(&mut EditHistory) -> Result<&HistoryEntry, HistoryError>,
    ) -> Result<Arc<Artifact>, EditError> {
        let mut state = self.lock();
        state.ensure_idle(operation)?;
        let artifact = step(&mut state.history)?.artifact.clone();
        state.clear_transient();
        debug!("{} -> cursor {:?}", operation, state.history.cursor());
        Ok(artifact)
    }

    // ---- Transient selection ----

    /// Record a click on the displayed image as the retouch focus point.
    pub fn set_hotspot(&self, click: Point, display: Size) -> Result<Hotspot, EditError> {
        let mut state = self.lock();
        let current = state
            .history
            .current_artifact()
            .cloned()
            .ok_or(EditError::NoImage)?;
        let hotspot = hotspot_from_display(click, display, current.dimensions()?)?;
        state.hotspot = Some(hotspot);
        debug!("Hotspot set at ({}, {})", hotspot.x, hotspot.y);
        Ok(hotspot)
    }

    /// Close a lasso drawn in display space and keep its mask for the next
    /// inpaint. Returns the number of selected pixels.
    pub fn complete_selection(&self, points: &[Point], display: Size) -> Result<usize, EditError> {
        let mut state = self.lock();
        let current = state
            .history
            .current_artifact()
            .cloned()
            .ok_or(EditError::NoImage)?;
        let mask = rasterize_mask(points, display, current.dimensions()?)?;
        let selected = mask.selected_pixels();
        state.selection = Some(mask);
        debug!("Selection of {} points covers {} pixels", points.len(), selected);
        Ok(selected)
    }

    /// Drop the hotspot and selection, e.g. when the active tool changes.
    pub fn clear_selection(&self) {
        self.lock().clear_transient();
    }

    // ---- Edits ----

    /// Run `action` on the current image and push the result.
    pub async fn apply(&self, action: EditAction) -> Result<Arc<Artifact>, EditError> {
        let (guard, input) = self.begin_on(action.loading_message(), |h| {
            h.current_artifact().cloned()
        })?;

        let outcome = apply_action(self.model.as_ref(), &input, &action).await;
        let description = action.description();
        self.settle(
            guard,
            outcome,
            Some(FailedCall::Edit(action)),
            |state, artifact| {
                let artifact = Arc::new(artifact);
                let discarded = state.history.push(artifact.clone(), Some(description));
                state.clear_transient();
                info!(
                    "Edit applied: cursor {:?}, {} entries discarded",
                    state.history.cursor(),
                    discarded.len()
                );
                artifact
            },
        )
    }

    pub async fn retouch_at_hotspot(&self, prompt: &str) -> Result<Arc<Artifact>, EditError> {
        let hotspot = self.lock().hotspot.ok_or(EditError::NoHotspot)?;
        self.apply(EditAction::Retouch {
            prompt: prompt.to_string(),
            hotspot,
        })
        .await
    }

    pub async fn inpaint_selection(&self, prompt: &str) -> Result<Arc<Artifact>, EditError> {
        let mask = self.lock().selection.clone().ok_or(EditError::NoSelection)?;
        self.apply(EditAction::Inpaint {
            prompt: prompt.to_string(),
            mask,
        })
        .await
    }

    /// Crop locally and push the result. Crops carry no description, so
    /// they are not recorded into presets.
    ///
    /// The pixels are composed with the session unlocked.
    pub fn crop(&self, displayed: Rect, display: Size) -> Result<Arc<Artifact>, EditError> {
        let (generation, current, pixel_ratio) = {
            let state = self.lock();
            state.ensure_idle("crop")?;
            let current = state
                .history
                .current_artifact()
                .cloned()
                .ok_or(EditError::NoImage)?;
            (state.generation, current, state.pixel_ratio)
        };

        let natural = current.dimensions()?;
        let cropped = crop_artifact(&current, displayed, display, natural, pixel_ratio)?;
        self.commit_crop(generation, &current, cropped)
    }

    /// Push a crop of `source`, unless the session moved on while it was
    /// being composed.
    fn commit_crop(
        &self,
        generation: u64,
        source: &Arc<Artifact>,
        cropped: Artifact,
    ) -> Result<Arc<Artifact>, EditError> {
        let mut state = self.lock();
        let unchanged = state
            .history
            .current_artifact()
            .is_some_and(|current| Arc::ptr_eq(current, source));
        if state.generation != generation || !unchanged {
            warn!("Discarding crop of {}: the image changed", source.filename());
            return Err(EditError::Stale);
        }
        state.ensure_idle("crop")?;

        let cropped = Arc::new(cropped);
        state.history.push(cropped.clone(), None);
        state.clear_transient();
        info!("Cropped to {}", cropped.filename());
        Ok(cropped)
    }

    /// Re-run the last failed edit or generation.
    pub async fn retry(&self) -> Result<Arc<Artifact>, EditError> {
        let call = self.failed_call()?;
        info!("Retrying last failed request");
        match call {
            FailedCall::Edit(action) => self.apply(action).await,
            FailedCall::Generate(prompt) => self.generate(&prompt).await,
        }
    }

    fn failed_call(&self) -> Result<FailedCall, EditError> {
        let state = self.lock();
        state.ensure_idle("retry")?;
        state.last_failed.clone().ok_or(EditError::NothingToRetry)
    }

    /// Close the error panel. The history was never touched by the failure.
    pub fn dismiss_error(&self) {
        let mut state = self.lock();
        if matches!(state.status, EditStatus::Error { .. }) {
            state.status = EditStatus::Idle;
            state.last_failed = None;
        }
    }

    // ---- Variations ----

    /// Ask for `count` alternative renditions of the current image.
    ///
    /// The whole chain holds the edit guard; history is not touched.
    pub async fn generate_variations(
        &self,
        prompt: Option<&str>,
        count: usize,
    ) -> Result<Vec<Artifact>, EditError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let (guard, input) =
            self.begin_on("Generating variations...", |h| h.current_artifact().cloned())?;
        let generation = guard.generation();

        let outcome = async {
            let mut variations = Vec::with_capacity(count);
            for index in 0..count {
                if !self.is_current(generation) {
                    return Err(EditError::Stale);
                }
                self.set_pending_message(
                    generation,
                    format!("Generating variation {} of {}...", index + 1, count),
                );
                let text = build_variation_prompt(prompt, index, count);
                let result = self
                    .model
                    .transform_image(&input, &text, &TransformExtras::none())
                    .await?;
                let filename = format!(
                    "{}-variation-{}.{}",
                    input.file_stem(),
                    index + 1,
                    extension_for_mime(result.mime_type())
                );
                variations.push(result.with_filename(filename));
            }
            Ok::<_, EditError>(variations)
        }
        .await;

        self.settle(guard, outcome, None, |_, variations| variations)
    }

    /// Push a variation the user picked.
    pub fn adopt_variation(&self, variation: Artifact) -> Result<Arc<Artifact>, EditError> {
        let mut state = self.lock();
        state.ensure_idle("adopt variation")?;
        if state.history.is_empty() {
            return Err(EditError::NoImage);
        }
        let artifact = Arc::new(variation);
        state
            .history
            .push(artifact.clone(), Some("Variation".to_string()));
        state.clear_transient();
        Ok(artifact)
    }

    // ---- Exports and analysis ----

    /// Animate the path from the original to the current image.
    pub fn export_history_gif(&self, delay_ms: u32) -> Result<Artifact, EditError> {
        let (frames, stem) = {
            let state = self.lock();
            let cursor = state.history.cursor().ok_or(EditError::NoImage)?;
            let frames: Vec<Artifact> = state.history.entries()[..=cursor]
                .iter()
                .map(|e| Artifact::clone(&e.artifact))
                .collect();
            let stem = frames[0].file_stem().to_string();
            (frames, stem)
        };
        info!("Exporting {} history frames as GIF", frames.len());
        Ok(assemble_gif(&frames, delay_ms, format!("{}-history.gif", stem))?)
    }

    /// Edits the model proposes for the current image.
    pub async fn suggest(&self) -> Result<Vec<Suggestion>, EditError> {
        let (generation, input) = self.snapshot_current()?;
        let value = self
            .model
            .analyze_image(&input, &build_suggestions_prompt())
            .await?;
        if !self.is_current(generation) {
            return Err(EditError::Stale);
        }
        Ok(parse_suggestions(value)?)
    }

    /// A text-to-image prompt describing the current image.
    pub async fn describe(&self) -> Result<String, EditError> {
        let (generation, input) = self.snapshot_current()?;
        let value = self
            .model
            .analyze_image(&input, &build_reverse_prompt_prompt())
            .await?;
        if !self.is_current(generation) {
            return Err(EditError::Stale);
        }
        Ok(parse_reverse_prompt(&value)?)
    }

    // ---- Guard plumbing ----

    fn snapshot_current(&self) -> Result<(u64, Arc<Artifact>), EditError> {
        let state = self.lock();
        let current = state
            .history
            .current_artifact()
            .cloned()
            .ok_or(EditError::NoImage)?;
        Ok((state.generation, current))
    }

    /// Take the guard with `pick` choosing the input artifact.
    pub(crate) fn begin_on(
        &self,
        message: &str,
        pick: impl FnOnce(&EditHistory) -> Option<Arc<Artifact>>,
    ) -> Result<(PendingGuard, Arc<Artifact>), EditError> {
        let mut state = self.lock();
        state.ensure_idle(message)?;
        let input = pick(&state.history).ok_or(EditError::NoImage)?;
        state.status = EditStatus::Pending {
            message: message.to_string(),
        };
        debug!("{} (generation {})", message, state.generation);
        Ok((self.guard(state.generation), input))
    }

    /// Take the guard for a call that needs no input image.
    fn begin_detached(&self, message: &str) -> Result<PendingGuard, EditError> {
        let mut state = self.lock();
        state.ensure_idle(message)?;
        state.status = EditStatus::Pending {
            message: message.to_string(),
        };
        Ok(self.guard(state.generation))
    }

    fn guard(&self, generation: u64) -> PendingGuard {
        PendingGuard {
            state: Arc::clone(&self.state),
            generation,
            settled: false,
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    pub(crate) fn set_pending_message(&self, generation: u64, message: String) {
        let mut state = self.lock();
        if state.generation == generation && state.status.is_pending() {
            state.status = EditStatus::Pending { message };
        }
    }

    /// Release `guard` with the outcome of the call it was taken for.
    pub(crate) fn settle<T, R>(
        &self,
        mut guard: PendingGuard,
        outcome: Result<T, EditError>,
        retry_with: Option<FailedCall>,
        on_success: impl FnOnce(&mut SessionState, T) -> R,
    ) -> Result<R, EditError> {
        guard.settled = true;
        let generation = guard.generation;
        let mut state = self.lock();
        if state.generation != generation {
            warn!(
                "Discarding result from session {} (now {})",
                generation, state.generation
            );
            return Err(EditError::Stale);
        }
        match outcome {
            Ok(value) => {
                state.status = EditStatus::Idle;
                state.last_failed = None;
                Ok(on_success(&mut *state, value))
            }
            Err(err) => {
                error!("Request failed: {}", err);
                state.status = EditStatus::Error {
                    message: err.to_string(),
                };
                state.last_failed = retry_with;
                Err(err)
            }
        }
    }
}
