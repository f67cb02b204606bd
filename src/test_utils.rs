//! In-process model used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use image::{DynamicImage, Rgba, RgbaImage};

use crate::artifact::Artifact;
use crate::error::ModelError;
use crate::model::{ModelService, StringMap, TransformExtras};

/// Prompts containing this marker make the mock refuse.
pub const FAIL_MARKER: &str = "[fail]";

pub fn solid_png(width: u32, height: u32, filename: &str) -> Artifact {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 120, 40, 255]));
    Artifact::from_image(&DynamicImage::ImageRgba8(image), filename).unwrap()
}

#[derive(Default)]
pub struct MockModel {
    delay: Option<Duration>,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    inputs: Mutex<Vec<Artifact>>,
    extras: Mutex<Vec<(bool, bool)>>,
    analysis: Mutex<Option<serde_json::Value>>,
    translation: Mutex<Option<StringMap>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_analysis(&self, value: serde_json::Value) {
        *self.analysis.lock().unwrap() = Some(value);
    }

    /// Fixed translation answer; without one, values are prefixed with the language.
    pub fn set_translation(&self, map: StringMap) {
        *self.translation.lock().unwrap() = Some(map);
    }

    /// Make the next `count` image calls fail regardless of prompt.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<Artifact> {
        self.inputs.lock().unwrap().clone()
    }

    /// `(has second image, has mask)` per transform call.
    pub fn extras_seen(&self) -> Vec<(bool, bool)> {
        self.extras.lock().unwrap().clone()
    }

    async fn enter(&self, prompt: &str) -> usize {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        n
    }
}

impl ModelService for MockModel {
    async fn transform_image(
        &self,
        image: &Artifact,
        prompt: &str,
        extras: &TransformExtras,
    ) -> Result<Artifact, ModelError> {
        self.inputs.lock().unwrap().push(image.clone());
        self.extras
            .lock()
            .unwrap()
            .push((extras.second_image.is_some(), extras.mask.is_some()));
        let n = self.enter(prompt).await;
        if prompt.contains(FAIL_MARKER) || self.take_failure() {
            return Err(ModelError::Refused(format!("refused call {}", n)));
        }
        let size = image.dimensions().map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
        let shade = (n * 40 % 256) as u8;
        let out = RgbaImage::from_pixel(size.width, size.height, Rgba([shade, shade, shade, 255]));
        Artifact::from_image(&DynamicImage::ImageRgba8(out), format!("result-{}.png", n))
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Artifact, ModelError> {
        let n = self.enter(prompt).await;
        if prompt.contains(FAIL_MARKER) || self.take_failure() {
            return Err(ModelError::EmptyResult("no image".to_string()));
        }
        Ok(solid_png(16, 12, &format!("generated-{}.png", n)))
    }

    async fn analyze_image(
        &self,
        _image: &Artifact,
        instruction: &str,
    ) -> Result<serde_json::Value, ModelError> {
        self.enter(instruction).await;
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ModelError::MalformedResponse("no analysis scripted".to_string()))
    }

    async fn translate(
        &self,
        strings: &StringMap,
        target_language: &str,
    ) -> Result<StringMap, ModelError> {
        self.enter(target_language).await;
        if let Some(map) = self.translation.lock().unwrap().clone() {
            return Ok(map);
        }
        Ok(strings
            .iter()
            .map(|(k, v)| (k.clone(), format!("[{}] {}", target_language, v)))
            .collect())
    }
}
