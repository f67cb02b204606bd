use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::artifact::Artifact;
use crate::error::EditError;
use crate::model::prompts::{
    build_adjustment_prompt, build_filter_prompt, build_inpaint_prompt, build_outpaint_prompt,
    build_remove_background_prompt, build_retouch_prompt, build_style_transfer_prompt,
    build_upscale_prompt,
};
use crate::model::{ModelService, TransformExtras};
use crate::raster::compose::{expand_canvas, ExpandDirection};
use crate::raster::geometry::Hotspot;
use crate::raster::mask::Mask;

/// Every model-backed edit the editor can perform.
#[derive(Debug, Clone)]
pub enum EditAction {
    /// Localized edit around a focus point.
    Retouch { prompt: String, hotspot: Hotspot },
    Filter { prompt: String },
    Adjustment { prompt: String },
    RemoveBackground,
    Upscale { factor: u32 },
    /// Outpainting: the canvas is grown first, the model fills the new edges.
    Expand {
        pixels: u32,
        direction: ExpandDirection,
        prompt: Option<String>,
    },
    StyleTransfer {
        style: Arc<Artifact>,
        prompt: Option<String>,
    },
    /// Lasso inpainting; the mask is at the source's natural resolution.
    Inpaint { prompt: String, mask: Mask },
}

impl EditAction {
    /// Label recorded in history. Prompt-driven edits record the prompt
    /// itself so presets can replay them.
    pub fn description(&self) -> String {
        match self {
            Self::Retouch { prompt, .. }
            | Self::Filter { prompt }
            | Self::Adjustment { prompt }
            | Self::Inpaint { prompt, .. } => prompt.trim().to_string(),
            Self::RemoveBackground => "Remove the background".to_string(),
            Self::Upscale { factor } => format!("Upscale {}x", factor),
            Self::Expand {
                pixels,
                direction,
                prompt,
            } => match prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                Some(p) => format!("Expand {} by {}px: {}", direction.label(), pixels, p),
                None => format!("Expand {} by {}px", direction.label(), pixels),
            },
            Self::StyleTransfer { prompt, .. } => {
                match prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                    Some(p) => format!("Style transfer: {}", p),
                    None => "Style transfer".to_string(),
                }
            }
        }
    }

    pub fn loading_message(&self) -> &'static str {
        match self {
            Self::Retouch { .. } => "Retouching the selected area...",
            Self::Filter { .. } => "Applying filter...",
            Self::Adjustment { .. } => "Applying adjustment...",
            Self::RemoveBackground => "Removing background...",
            Self::Upscale { .. } => "Upscaling image...",
            Self::Expand { .. } => "Expanding the canvas...",
            Self::StyleTransfer { .. } => "Transferring style...",
            Self::Inpaint { .. } => "Editing the selection...",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Retouch { .. } => "retouch",
            Self::Filter { .. } => "filter",
            Self::Adjustment { .. } => "adjustment",
            Self::RemoveBackground => "remove-background",
            Self::Upscale { .. } => "upscale",
            Self::Expand { .. } => "expand",
            Self::StyleTransfer { .. } => "style-transfer",
            Self::Inpaint { .. } => "inpaint",
        }
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.description())
    }
}

/// Run one edit against the model and return the new artifact.
///
/// The result is named after `input`. No session state is touched here;
/// callers decide what to do with the outcome.
pub async fn apply_action<M>(
    model: &M,
    input: &Artifact,
    action: &EditAction,
) -> Result<Artifact, EditError>
where
    M: ModelService + ?Sized,
{
    info!("Applying {} to {}", action, input.filename());

    let result = match action {
        EditAction::Retouch { prompt, hotspot } => {
            let extras = TransformExtras {
                hotspot: Some(*hotspot),
                ..TransformExtras::none()
            };
            model
                .transform_image(input, &build_retouch_prompt(prompt, *hotspot), &extras)
                .await?
        }
        EditAction::Filter { prompt } => {
            model
                .transform_image(input, &build_filter_prompt(prompt), &TransformExtras::none())
                .await?
        }
        EditAction::Adjustment { prompt } => {
            model
                .transform_image(input, &build_adjustment_prompt(prompt), &TransformExtras::none())
                .await?
        }
        EditAction::RemoveBackground => {
            model
                .transform_image(input, &build_remove_background_prompt(), &TransformExtras::none())
                .await?
        }
        EditAction::Upscale { factor } => {
            model
                .transform_image(input, &build_upscale_prompt(*factor), &TransformExtras::none())
                .await?
        }
        EditAction::Expand {
            pixels,
            direction,
            prompt,
        } => {
            let canvas = expand_canvas(input, *pixels, *direction)?;
            debug!("Outpainting on {} ({} bytes)", canvas.filename(), canvas.len());
            let text = build_outpaint_prompt(*direction, *pixels, prompt.as_deref());
            model
                .transform_image(&canvas, &text, &TransformExtras::none())
                .await?
        }
        EditAction::StyleTransfer { style, prompt } => {
            let extras = TransformExtras {
                second_image: Some(Artifact::clone(style)),
                ..TransformExtras::none()
            };
            model
                .transform_image(input, &build_style_transfer_prompt(prompt.as_deref()), &extras)
                .await?
        }
        EditAction::Inpaint { prompt, mask } => {
            let extras = TransformExtras {
                mask: Some(mask.to_artifact()?),
                ..TransformExtras::none()
            };
            model
                .transform_image(input, &build_inpaint_prompt(prompt), &extras)
                .await?
        }
    };

    Ok(result.named_after(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::geometry::{Point, Size};
    use crate::raster::mask::rasterize_mask;
    use crate::test_utils::{solid_png, MockModel};

    #[test]
    fn test_descriptions() {
        assert_eq!(
            EditAction::Filter { prompt: " noir ".into() }.description(),
            "noir"
        );
        assert_eq!(EditAction::Upscale { factor: 4 }.description(), "Upscale 4x");
        let expand = EditAction::Expand {
            pixels: 128,
            direction: ExpandDirection::Left,
            prompt: None,
        };
        assert_eq!(expand.description(), "Expand left by 128px");
    }

    #[tokio::test]
    async fn test_result_named_after_input() {
        let model = MockModel::new();
        let input = solid_png(8, 8, "holiday.jpg");
        let out = apply_action(&model, &input, &EditAction::Adjustment { prompt: "warmer".into() })
            .await
            .unwrap();
        assert_eq!(out.filename(), "holiday.png");
        assert!(model.prompts()[0].contains("warmer"));
    }

    #[tokio::test]
    async fn test_expand_sends_grown_canvas() {
        let model = MockModel::new();
        let input = solid_png(10, 6, "beach.png");
        apply_action(
            &model,
            &input,
            &EditAction::Expand {
                pixels: 4,
                direction: ExpandDirection::All,
                prompt: Some("more sand".into()),
            },
        )
        .await
        .unwrap();

        let inputs = model.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].dimensions().unwrap(), Size::new(18, 14));
        assert!(model.prompts()[0].contains("more sand"));
    }

    #[tokio::test]
    async fn test_inpaint_and_style_pass_extras() {
        let model = MockModel::new();
        let input = solid_png(8, 8, "cat.png");
        let mask = rasterize_mask(
            &[Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 4.0)],
            Size::new(8, 8),
            Size::new(8, 8),
        )
        .unwrap();

        apply_action(&model, &input, &EditAction::Inpaint { prompt: "add a hat".into(), mask })
            .await
            .unwrap();
        let style = Arc::new(solid_png(2, 2, "starry.png"));
        apply_action(&model, &input, &EditAction::StyleTransfer { style, prompt: None })
            .await
            .unwrap();

        let extras = model.extras_seen();
        assert_eq!(extras, vec![(false, true), (true, false)]);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = MockModel::new();
        let input = solid_png(4, 4, "a.png");
        let err = apply_action(&model, &input, &EditAction::Filter { prompt: "[fail] noir".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::Model(_)));
    }
}
