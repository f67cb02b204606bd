use thiserror::Error;

/// Local precondition failures in the raster utilities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("A selection needs at least 3 points, got {got}")]
    InsufficientPoints { got: usize },

    #[error("Image dimensions must be non-zero")]
    EmptySize,

    #[error("Crop rectangle is empty or outside the image")]
    InvalidRect,

    #[error("Canvas of {width}x{height} exceeds the {max}px limit per side")]
    CanvasTooLarge { width: u64, height: u64, max: u32 },

    #[error("Pixel ratio must be a positive finite number, got {0}")]
    InvalidPixelRatio(f64),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to build archive: {0}")]
    Archive(String),
}

/// Failures reported by (or while talking to) the remote model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The model declined the request for policy or safety reasons.
    #[error("{0}")]
    Refused(String),

    /// The model answered without a usable image or text.
    #[error("{0}")]
    EmptyResult(String),

    #[error("The model returned an unexpected response: {0}")]
    MalformedResponse(String),

    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("No API key found in environment variable '{0}'")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("History is empty")]
    Empty,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to (de)serialize stored value: {0}")]
    Serialization(String),
}

/// Everything an edit, batch run or preset replay can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("Another edit is already in progress")]
    Busy,

    #[error("No image is loaded")]
    NoImage,

    /// The session changed while the request was in flight; the result was dropped.
    #[error("The editing session changed before the result arrived")]
    Stale,

    #[error("Click the image to choose where to edit")]
    NoHotspot,

    #[error("Draw a selection of at least 3 points first")]
    NoSelection,

    #[error("There is no failed action to retry")]
    NothingToRetry,

    #[error("The preset has no actions")]
    EmptyPreset,

    #[error("Preset name must not be empty")]
    UnnamedPreset,

    #[error("{0} cannot be applied to a batch")]
    UnsupportedInBatch(String),

    #[error("{pending} of {total} batch jobs are not finished")]
    BatchIncomplete { pending: usize, total: usize },

    #[error("Preset step {step} of {total} (\"{prompt}\") failed: {source}")]
    PresetStep {
        step: usize,
        total: usize,
        prompt: String,
        source: Box<EditError>,
    },

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EditError> for String {
    fn from(err: EditError) -> Self {
        err.to_string()
    }
}

impl From<ModelError> for String {
    fn from(err: ModelError) -> Self {
        err.to_string()
    }
}
