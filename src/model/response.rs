//! Parsing of structured (JSON) model answers.

use tracing::error;

use crate::error::ModelError;
use crate::model::types::{StringMap, Suggestion};

/// Strip markdown code fences if the model wrapped its JSON in them.
pub fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Opening fence, with optional language tag
        let after_open = match trimmed.find('\n') {
            Some(pos) => &trimmed[pos + 1..],
            None => trimmed.trim_start_matches('`'),
        };
        let cleaned = after_open.trim_end();
        match cleaned.strip_suffix("```") {
            Some(inner) => inner.trim().to_string(),
            None => cleaned.to_string(),
        }
    } else {
        trimmed.to_string()
    }
}

/// Parse model text as JSON, tolerating code fences.
pub fn parse_json_text(text: &str) -> Result<serde_json::Value, ModelError> {
    let cleaned = strip_markdown_json(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        let truncated = if cleaned.len() > 500 {
            let mut end = 500;
            while !cleaned.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &cleaned[..end])
        } else {
            cleaned.clone()
        };
        let msg = format!("invalid JSON ({}); raw response: {}", e, truncated);
        error!("{}", msg);
        ModelError::MalformedResponse(msg)
    })
}

/// `{"suggestions": [...]}` or a bare array of suggestions.
pub fn parse_suggestions(value: serde_json::Value) -> Result<Vec<Suggestion>, ModelError> {
    let list = match value {
        serde_json::Value::Object(mut map) => map
            .remove("suggestions")
            .ok_or_else(|| ModelError::MalformedResponse("missing 'suggestions' field".to_string()))?,
        array @ serde_json::Value::Array(_) => array,
        other => {
            return Err(ModelError::MalformedResponse(format!(
                "expected an object with suggestions, got {}",
                kind_of(&other)
            )))
        }
    };
    let suggestions: Vec<Suggestion> = serde_json::from_value(list)
        .map_err(|e| ModelError::MalformedResponse(format!("suggestions do not match schema: {}", e)))?;

    Ok(suggestions
        .into_iter()
        .filter(|s| !s.prompt.trim().is_empty())
        .collect())
}

/// `{"prompt": "..."}`
pub fn parse_reverse_prompt(value: &serde_json::Value) -> Result<String, ModelError> {
    value["prompt"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ModelError::MalformedResponse("missing 'prompt' string".to_string()))
}

/// A flat JSON object of string values.
pub fn parse_string_map(value: serde_json::Value) -> Result<StringMap, ModelError> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => Ok((k, s)),
                other => Err(ModelError::MalformedResponse(format!(
                    "value of '{}' is {}, expected a string",
                    k,
                    kind_of(&other)
                ))),
            })
            .collect(),
        other => Err(ModelError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::SuggestionKind;

    #[test]
    fn test_strip_markdown_json() {
        assert_eq!(strip_markdown_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_markdown_json("```\n[1]\n```"), "[1]");
        assert_eq!(strip_markdown_json("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_json_text_rejects_prose() {
        let err = parse_json_text("Sure! Here are some ideas").unwrap_err();
        assert!(matches!(err, ModelError::MalformedResponse(_)));
        assert!(err.to_string().contains("Here are some ideas"));
    }

    #[test]
    fn test_parse_suggestions_object_and_array() {
        let object = serde_json::json!({
            "suggestions": [
                {"kind": "adjustment", "label": "Warmer", "prompt": "Warm the white balance"},
                {"kind": "filter", "label": "Empty", "prompt": "  "}
            ]
        });
        let parsed = parse_suggestions(object).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, SuggestionKind::Adjustment);

        let array = serde_json::json!([{"kind": "retouch", "label": "Fix", "prompt": "Remove glare"}]);
        assert_eq!(parse_suggestions(array).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_suggestions_rejects_wrong_shape() {
        assert!(matches!(
            parse_suggestions(serde_json::json!({"ideas": []})),
            Err(ModelError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_suggestions(serde_json::json!({"suggestions": [{"label": "x"}]})),
            Err(ModelError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_suggestions(serde_json::json!("nope")),
            Err(ModelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_reverse_prompt() {
        let value = serde_json::json!({"prompt": " a cat on a roof at dusk "});
        assert_eq!(parse_reverse_prompt(&value).unwrap(), "a cat on a roof at dusk");
        assert!(parse_reverse_prompt(&serde_json::json!({"prompt": ""})).is_err());
        assert!(parse_reverse_prompt(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_parse_string_map() {
        let map = parse_string_map(serde_json::json!({"a": "x", "b": "y"})).unwrap();
        assert_eq!(map.len(), 2);
        assert!(parse_string_map(serde_json::json!({"a": 1})).is_err());
        assert!(parse_string_map(serde_json::json!(["a"])).is_err());
    }
}
