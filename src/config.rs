//! TOML configuration.
//!
//! Two ways to get a [`StudioConfig`]:
//! - `default_config()` - the defaults embedded in the crate
//! - `load_config(path)` - a file on disk, missing keys falling back to defaults

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Defaults embedded at compile time from `config/default.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Concurrent batch jobs when nothing else is configured.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 3;

/// Entries kept in the recent-prompt list.
pub const DEFAULT_PROMPT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub model: ModelConfig,
    pub editor: EditorConfig,
    pub batch: BatchConfig,
    pub library: LibraryConfig,
}

/// Remote model endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_base: String,
    /// Model used for every image-producing call
    pub image_model: String,
    /// Model used for JSON answers and translation
    pub text_model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum history length; `None` keeps everything.
    pub max_history: Option<usize>,
    /// Device pixel ratio applied to crops.
    pub pixel_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub prompt_history_limit: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            image_model: "gemini-2.5-flash-image-preview".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: None,
            pixel_ratio: 1.0,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            prompt_history_limit: DEFAULT_PROMPT_HISTORY_LIMIT,
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<StudioConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration text; absent sections and keys take their defaults.
pub fn parse_config(content: &str) -> Result<StudioConfig> {
    let config: StudioConfig = toml::from_str(content)?;
    if config.batch.concurrency == 0 {
        anyhow::bail!("batch.concurrency must be at least 1");
    }
    Ok(config)
}

/// The configuration embedded in the crate.
///
/// # Panics
/// Panics if the embedded TOML is invalid (a build-time bug).
pub fn default_config() -> StudioConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded default.toml must be valid TOML")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = default_config();
        assert_eq!(config.batch.concurrency, 3);
        assert_eq!(config.library.prompt_history_limit, 20);
        assert_eq!(config.editor.max_history, None);
        assert_eq!(config.model.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = parse_config("[batch]\nconcurrency = 5\n").unwrap();
        assert_eq!(config.batch.concurrency, 5);
        assert_eq!(config.library.prompt_history_limit, 20);
        assert_eq!(config.model.timeout_secs, 120);
    }

    #[test]
    fn test_max_history_override() {
        let config = parse_config("[editor]\nmax_history = 10\n").unwrap();
        assert_eq!(config.editor.max_history, Some(10));
        assert_eq!(config.editor.pixel_ratio, 1.0);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(parse_config("[batch]\nconcurrency = 0\n").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pixshop.toml");
        std::fs::write(&path, "[model]\nimage_model = \"custom-image\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.model.image_model, "custom-image");
        assert_eq!(config.model.text_model, "gemini-2.5-flash");
    }
}
