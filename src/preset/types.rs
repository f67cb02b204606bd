use serde::{Deserialize, Serialize};

use crate::history::EditHistory;

/// One recorded step: the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetAction {
    pub prompt: String,
}

/// A named, replayable sequence of prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub actions: Vec<PresetAction>,
}

impl Preset {
    pub fn new<I, S>(name: impl Into<String>, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            actions: prompts
                .into_iter()
                .map(|p| PresetAction { prompt: p.into() })
                .collect(),
        }
    }

    /// Record the described edits from entry 1 up to the cursor.
    pub fn from_history(name: impl Into<String>, history: &EditHistory) -> Self {
        Self::new(name, history.applied_descriptions())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Reported before each replay step starts; `current` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetProgress {
    pub current: usize,
    pub total: usize,
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::artifact::Artifact;

    fn artifact(name: &str) -> Arc<Artifact> {
        Arc::new(Artifact::new(vec![0], name, "image/png"))
    }

    #[test]
    fn test_from_history_stops_at_cursor() {
        let mut history = EditHistory::new();
        history.push(artifact("a0"), None);
        history.push(artifact("a1"), Some("warmer".to_string()));
        history.push(artifact("crop"), None);
        history.push(artifact("a2"), Some("noir".to_string()));
        history.push(artifact("a3"), Some("grain".to_string()));
        history.undo().unwrap();

        let preset = Preset::from_history("moody", &history);
        assert_eq!(preset, Preset::new("moody", ["warmer", "noir"]));
    }

    #[test]
    fn test_serialized_shape() {
        let preset = Preset::new("warm", ["warmer"]);
        let json = serde_json::to_value(&preset).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "warm", "actions": [{"prompt": "warmer"}]})
        );
    }
}
