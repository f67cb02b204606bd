//! Prompt construction for every model call the editor makes.
//!
//! The model sees only the image parts and these strings, so everything the
//! editor knows about the request (focus point, mask semantics, which edges
//! are blank) has to be spelled out here.

use crate::model::types::StringMap;
use crate::raster::compose::ExpandDirection;
use crate::raster::geometry::Hotspot;

const OUTPUT_IMAGE_ONLY: &str = "Output: return only the final edited image. Do not return text.";

const SAFETY_POLICY: &str = r#"Safety and ethics policy:
- You may adjust skin tone on request (e.g. "give me a tan") as a standard photo enhancement.
- You must refuse any request to change a person's fundamental race or ethnicity."#;

/// Localized edit around a focus point.
pub fn build_retouch_prompt(request: &str, hotspot: Hotspot) -> String {
    format!(
        r#"You are an expert photo editor. Perform a natural, localized edit on the provided image.

User request: "{request}"
Edit location: focus on the area around pixel coordinates (x: {x}, y: {y}).

Editing guidelines:
- The edit must be photorealistic and blend with the surrounding area.
- Everything outside the immediate edit area must stay identical to the original.

{policy}

{output}"#,
        request = request.trim(),
        x = hotspot.x,
        y = hotspot.y,
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

/// Stylistic filter over the whole frame; composition is untouched.
pub fn build_filter_prompt(filter: &str) -> String {
    format!(
        r#"You are an expert photo editor. Apply a stylistic filter to the entire image. Do not change the composition or content, only the style.

Filter request: "{filter}"

{policy}

{output}"#,
        filter = filter.trim(),
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

/// Global photographic adjustment (light, color, mood).
pub fn build_adjustment_prompt(adjustment: &str) -> String {
    format!(
        r#"You are an expert photo editor. Perform a natural, global adjustment to the entire image.

User request: "{adjustment}"

Editing guidelines:
- The adjustment must apply across the whole image.
- The result must stay photorealistic.

{policy}

{output}"#,
        adjustment = adjustment.trim(),
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

pub fn build_remove_background_prompt() -> String {
    format!(
        r#"You are an expert photo editor. Remove the background of the image and keep only the main subject.

Guidelines:
- Keep the subject's edges clean, including hair and fine detail.
- The background must be fully transparent.

{output}"#,
        output = OUTPUT_IMAGE_ONLY,
    )
}

pub fn build_upscale_prompt(factor: u32) -> String {
    format!(
        r#"You are an expert image restoration engine. Upscale the image by a factor of {factor}.

Guidelines:
- Increase resolution and recover fine detail and texture.
- Do not add, remove or move any content.
- Remove compression artifacts and noise without over-smoothing.

{output}"#,
        factor = factor,
        output = OUTPUT_IMAGE_ONLY,
    )
}

/// Outpainting over a canvas whose new edges are transparent.
pub fn build_outpaint_prompt(direction: ExpandDirection, pixels: u32, request: Option<&str>) -> String {
    let guidance = match request.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("\nAdditional guidance from the user: \"{}\"\n", r),
        None => String::new(),
    };
    format!(
        r#"You are an expert photo editor. The provided image has been extended by {pixels} transparent pixels on the {edges} edge(s).
Fill the transparent area with new content that continues the existing scene seamlessly (perspective, lighting, texture and color).
The existing, non-transparent pixels must stay identical.
{guidance}
{policy}

{output}"#,
        pixels = pixels,
        edges = direction.label(),
        guidance = guidance,
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

/// Style transfer: first image is the content, second is the style reference.
pub fn build_style_transfer_prompt(request: Option<&str>) -> String {
    let guidance = match request.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("\nAdditional guidance from the user: \"{}\"\n", r),
        None => String::new(),
    };
    format!(
        r#"You are an expert digital artist. Re-render the first image in the artistic style of the second image.
Keep the subject, composition and layout of the first image; take palette, brushwork and texture from the second.
{guidance}
{policy}

{output}"#,
        guidance = guidance,
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

/// Inpainting inside a lasso mask (second image; white = editable).
pub fn build_inpaint_prompt(request: &str) -> String {
    format!(
        r#"You are an expert photo editor. The second image is a black and white mask with the same size as the first image.
Edit only the region of the first image that is white in the mask; black regions must stay identical.

User request: "{request}"

{policy}

{output}"#,
        request = request.trim(),
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

/// One of several alternative renditions of the same request.
pub fn build_variation_prompt(request: Option<&str>, index: usize, count: usize) -> String {
    let base = match request.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("Create a creative variation of this image following this request: \"{}\".", r),
        None => "Create a creative variation of this image with a different mood or styling.".to_string(),
    };
    format!(
        "{base}\nThis is variation {n} of {count}; make it clearly distinct from the others while keeping the main subject recognizable.\n\n{policy}\n\n{output}",
        base = base,
        n = index + 1,
        count = count,
        policy = SAFETY_POLICY,
        output = OUTPUT_IMAGE_ONLY,
    )
}

pub fn build_suggestions_prompt() -> String {
    r#"You are a professional photo editor reviewing this image. Propose 3 to 6 edits that would improve it.
Each suggestion has:
- kind: "filter" (stylistic look over the whole image), "adjustment" (global light/color correction) or "retouch" (a localized fix)
- label: a short button label (max 4 words)
- prompt: the exact instruction to send to an image editing model

Respond with JSON only: {"suggestions": [{"kind": ..., "label": ..., "prompt": ...}]}"#
        .to_string()
}

pub fn build_reverse_prompt_prompt() -> String {
    r#"Describe this image as a detailed prompt for a text-to-image model: subject, composition, lighting, color palette, lens and style.
Respond with JSON only: {"prompt": "..."}"#
        .to_string()
}

/// Translation of a UI string table; keys and `{placeholders}` must survive.
pub fn build_translation_prompt(strings: &StringMap, target_language: &str) -> String {
    let source = serde_json::to_string_pretty(strings).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Translate the values of this JSON object into the language with code "{lang}".

Rules:
- Keep every key exactly as it is; translate only the values.
- Keep placeholder tokens in curly braces (for example {{count}}) exactly as they are.
- Respond with the JSON object only, no markdown.

{source}"#,
        lang = target_language,
        source = source,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retouch_prompt_includes_hotspot() {
        let prompt = build_retouch_prompt("remove the mole", Hotspot { x: 120, y: 48 });
        assert!(prompt.contains("remove the mole"));
        assert!(prompt.contains("x: 120"));
        assert!(prompt.contains("y: 48"));
    }

    #[test]
    fn test_filter_and_adjustment_prompts_include_request() {
        assert!(build_filter_prompt("  noir ").contains("\"noir\""));
        assert!(build_adjustment_prompt("warmer").contains("\"warmer\""));
    }

    #[test]
    fn test_outpaint_prompt_names_edges() {
        let prompt = build_outpaint_prompt(ExpandDirection::Horizontal, 256, None);
        assert!(prompt.contains("256"));
        assert!(prompt.contains("left and right"));
        assert!(!prompt.contains("Additional guidance"));

        let guided = build_outpaint_prompt(ExpandDirection::Top, 64, Some("more sky"));
        assert!(guided.contains("more sky"));
    }

    #[test]
    fn test_variation_prompt_is_one_based() {
        let prompt = build_variation_prompt(None, 0, 4);
        assert!(prompt.contains("variation 1 of 4"));
    }

    #[test]
    fn test_suggestions_prompt_lists_kinds() {
        let prompt = build_suggestions_prompt();
        for kind in ["\"filter\"", "\"adjustment\"", "\"retouch\""] {
            assert!(prompt.contains(kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_translation_prompt_embeds_strings() {
        let mut strings = StringMap::new();
        strings.insert("batch.count".to_string(), "{count} images".to_string());
        let prompt = build_translation_prompt(&strings, "fr");
        assert!(prompt.contains("\"fr\""));
        assert!(prompt.contains("batch.count"));
        assert!(prompt.contains("{count} images"));
        assert!(prompt.contains("{count}"));
    }
}
