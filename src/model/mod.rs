//! The remote generative model, seen as an opaque async service.
//!
//! Four call shapes are consumed by the editor:
//! - `transform_image`: image(s) + prompt -> image (every edit)
//! - `generate_image`: prompt -> image (text-to-image)
//! - `analyze_image`: image + instruction -> JSON (suggestions, reverse prompt)
//! - `translate`: string table + language -> string table (UI localization)
//!
//! [`GeminiClient`] implements the trait over HTTP; tests substitute an
//! in-process implementation.

pub mod gemini;
pub mod prompts;
pub mod response;
pub mod types;

use std::future::Future;

use crate::artifact::Artifact;
use crate::error::ModelError;

pub use gemini::GeminiClient;
pub use types::{StringMap, Suggestion, SuggestionKind, TransformExtras};

/// Port to the remote model.
pub trait ModelService: Send + Sync {
    /// Produce a new image from `image` following `prompt`.
    ///
    /// Fails with [`ModelError::Refused`] on a policy block and
    /// [`ModelError::EmptyResult`] when no image comes back.
    fn transform_image(
        &self,
        image: &Artifact,
        prompt: &str,
        extras: &TransformExtras,
    ) -> impl Future<Output = Result<Artifact, ModelError>> + Send;

    fn generate_image(&self, prompt: &str)
        -> impl Future<Output = Result<Artifact, ModelError>> + Send;

    /// Ask a question about `image` and get a JSON answer back.
    ///
    /// Fails with [`ModelError::MalformedResponse`] if the answer is not JSON.
    fn analyze_image(
        &self,
        image: &Artifact,
        instruction: &str,
    ) -> impl Future<Output = Result<serde_json::Value, ModelError>> + Send;

    /// Translate the values of `strings` into `target_language`.
    fn translate(
        &self,
        strings: &StringMap,
        target_language: &str,
    ) -> impl Future<Output = Result<StringMap, ModelError>> + Send;
}
