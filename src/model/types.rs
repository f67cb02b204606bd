//! Types exchanged with the remote model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::raster::geometry::Hotspot;

/// UI string table: message key to text.
pub type StringMap = BTreeMap<String, String>;

/// Optional inputs of a transform call beyond the source image and prompt.
#[derive(Debug, Clone, Default)]
pub struct TransformExtras {
    /// Style reference for style transfer.
    pub second_image: Option<Artifact>,
    /// Focus point for localized retouching (natural pixels).
    pub hotspot: Option<Hotspot>,
    /// Black/white inpainting mask, same size as the source.
    pub mask: Option<Artifact>,
}

impl TransformExtras {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Kind of edit a suggestion proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Filter,
    Adjustment,
    Retouch,
}

/// An edit the model proposes after looking at the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    /// Short button label
    pub label: String,
    /// Prompt to run if the suggestion is accepted
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_deserialize() {
        let json = r#"{"kind": "filter", "label": "Noir", "prompt": "High-contrast black and white"}"#;
        let s: Suggestion = serde_json::from_str(json).unwrap();
        assert_eq!(s.kind, SuggestionKind::Filter);
        assert_eq!(s.label, "Noir");
    }

    #[test]
    fn test_suggestion_kind_rejects_unknown() {
        let json = r#"{"kind": "sculpt", "label": "x", "prompt": "y"}"#;
        assert!(serde_json::from_str::<Suggestion>(json).is_err());
    }
}
