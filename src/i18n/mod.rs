//! UI string translation through the model.
//!
//! The base string table ships with the app. Other languages are produced
//! on demand by the model, checked, cached per language in the key-value
//! store and reused on later runs without another call.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::error::{EditError, ModelError, StoreError};
use crate::model::{ModelService, StringMap};
use crate::storage::{keys, load_json, save_json, KeyValueStore};

struct ActiveLanguage {
    code: String,
    strings: StringMap,
}

pub struct Translator {
    store: Arc<dyn KeyValueStore>,
    base_language: String,
    base: StringMap,
    active: Mutex<ActiveLanguage>,
}

impl Translator {
    /// Restore the last selected language if its table is cached, else use
    /// the base language.
    pub fn new(store: Arc<dyn KeyValueStore>, base_language: &str, base: StringMap) -> Self {
        let mut active = ActiveLanguage {
            code: base_language.to_string(),
            strings: base.clone(),
        };

        match load_json::<String, _>(store.as_ref(), keys::LANGUAGE) {
            Ok(Some(code)) if code != base_language => {
                match load_json::<StringMap, _>(store.as_ref(), &cache_key(&code)) {
                    Ok(Some(strings)) => {
                        info!("Restored UI language '{}'", code);
                        active = ActiveLanguage { code, strings };
                    }
                    _ => warn!("No cached strings for '{}', using '{}'", code, base_language),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read the selected language: {}", e),
        }

        Self {
            store,
            base_language: base_language.to_string(),
            base,
            active: Mutex::new(active),
        }
    }

    pub fn base_language(&self) -> &str {
        &self.base_language
    }

    pub fn language(&self) -> String {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .code
            .clone()
    }

    /// Look up `key` in the active language, falling back to the base table.
    pub fn tr(&self, key: &str) -> String {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active
            .strings
            .get(key)
            .or_else(|| self.base.get(key))
            .cloned()
            .unwrap_or_else(|| format!("MISSING: {}", key))
    }

    pub fn cached(&self, language: &str) -> Result<Option<StringMap>, StoreError> {
        load_json(self.store.as_ref(), &cache_key(language))
    }

    pub fn clear_cache(&self, language: &str) -> Result<(), StoreError> {
        self.store.remove(&cache_key(language))
    }

    /// Switch the UI to `language`, translating the base table if needed.
    ///
    /// An answer with missing or extra keys, or with a `{placeholder}`
    /// dropped, is rejected with [`ModelError::MalformedResponse`] and
    /// nothing is cached.
    pub async fn select_language<M>(&self, model: &M, language: &str) -> Result<StringMap, EditError>
    where
        M: ModelService + ?Sized,
    {
        let language = language.trim();

        let strings = if language == self.base_language {
            self.base.clone()
        } else if let Some(cached) = self.cached(language)? {
            info!("Using cached strings for '{}'", language);
            cached
        } else {
            info!("Translating {} strings to '{}'", self.base.len(), language);
            let translated = model.translate(&self.base, language).await?;
            validate_translation(&self.base, &translated)?;
            save_json(self.store.as_ref(), &cache_key(language), &translated)?;
            translated
        };

        save_json(self.store.as_ref(), keys::LANGUAGE, language)?;
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = ActiveLanguage {
            code: language.to_string(),
            strings: strings.clone(),
        };
        Ok(strings)
    }
}

fn cache_key(language: &str) -> String {
    format!("{}{}", keys::TRANSLATION_PREFIX, language)
}

/// `{name}` tokens in `text`.
pub fn placeholders(text: &str) -> BTreeSet<&str> {
    let mut found = BTreeSet::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                if !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                {
                    found.insert(&rest[open..open + close + 2]);
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    found
}

/// Same keys as the source, and every source placeholder kept verbatim.
pub fn validate_translation(source: &StringMap, translated: &StringMap) -> Result<(), ModelError> {
    let missing: Vec<&str> = source
        .keys()
        .filter(|k| !translated.contains_key(*k))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ModelError::MalformedResponse(format!(
            "translation is missing keys: {}",
            missing.join(", ")
        )));
    }
    if let Some(extra) = translated.keys().find(|k| !source.contains_key(*k)) {
        return Err(ModelError::MalformedResponse(format!(
            "translation has unknown key '{}'",
            extra
        )));
    }

    for (key, text) in source {
        let translated_text = &translated[key];
        for token in placeholders(text) {
            if !translated_text.contains(token) {
                return Err(ModelError::MalformedResponse(format!(
                    "translation of '{}' dropped placeholder {}",
                    key, token
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_utils::MockModel;

    fn base() -> StringMap {
        let mut map = StringMap::new();
        map.insert("batch.count".to_string(), "{count} images".to_string());
        map.insert("editor.undo".to_string(), "Undo".to_string());
        map
    }

    #[test]
    fn test_placeholders() {
        let found: Vec<_> = placeholders("{count} of {total}, {not valid} {}").into_iter().collect();
        assert_eq!(found, vec!["{count}", "{total}"]);
        assert!(placeholders("no tokens {").is_empty());
    }

    #[test]
    fn test_validation_rejects_dropped_placeholder() {
        let mut translated = base();
        translated.insert("batch.count".to_string(), "images".to_string());
        let err = validate_translation(&base(), &translated).unwrap_err();
        assert!(matches!(err, ModelError::MalformedResponse(ref m) if m.contains("{count}")));
    }

    #[test]
    fn test_validation_rejects_key_changes() {
        let mut missing = base();
        missing.remove("editor.undo");
        assert!(validate_translation(&base(), &missing).is_err());

        let mut extra = base();
        extra.insert("new.key".to_string(), "x".to_string());
        assert!(validate_translation(&base(), &extra).is_err());
    }

    #[tokio::test]
    async fn test_base_language_needs_no_call() {
        let model = MockModel::new();
        let translator = Translator::new(Arc::new(MemoryStore::new()), "en", base());
        let strings = translator.select_language(&model, "en").await.unwrap();
        assert_eq!(strings, base());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_translation_is_cached_and_restored() {
        let model = MockModel::new();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let translator = Translator::new(store.clone(), "en", base());

        let fr = translator.select_language(&model, "fr").await.unwrap();
        assert_eq!(fr["editor.undo"], "[fr] Undo");
        assert_eq!(translator.tr("batch.count"), "[fr] {count} images");
        assert_eq!(translator.tr("nope"), "MISSING: nope");

        translator.select_language(&model, "fr").await.unwrap();
        assert_eq!(model.calls(), 1);

        // A new translator comes back in French without calling the model
        let restored = Translator::new(store, "en", base());
        assert_eq!(restored.language(), "fr");
        assert_eq!(restored.tr("editor.undo"), "[fr] Undo");
    }

    #[tokio::test]
    async fn test_bad_translation_is_not_cached() {
        let model = MockModel::new();
        let mut broken = base();
        broken.insert("batch.count".to_string(), "des images".to_string());
        model.set_translation(broken);

        let translator = Translator::new(Arc::new(MemoryStore::new()), "en", base());
        let err = translator.select_language(&model, "fr").await.unwrap_err();
        assert!(matches!(err, EditError::Model(ModelError::MalformedResponse(_))));
        assert_eq!(translator.cached("fr").unwrap(), None);
        assert_eq!(translator.language(), "en");
    }
}
