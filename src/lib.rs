pub mod artifact;
pub mod batch;
pub mod config;
pub mod edit;
pub mod error;
pub mod history;
pub mod i18n;
pub mod model;
pub mod preset;
pub mod raster;
pub mod storage;

#[cfg(test)]
mod test_utils;

pub use artifact::{Artifact, ArtifactId};
pub use batch::{BatchAction, BatchScheduler, JobStatus};
pub use config::StudioConfig;
pub use edit::{EditAction, EditStatus, EditorSession};
pub use error::{EditError, HistoryError, ModelError, RasterError, StoreError};
pub use history::{EditHistory, HistoryEntry};
pub use i18n::Translator;
pub use model::{GeminiClient, ModelService};
pub use preset::{Preset, PresetLibrary};
pub use storage::{KeyValueStore, MemoryStore, PromptHistory, SqliteStore};

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
