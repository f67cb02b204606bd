//! Canvas composition: crop extraction and canvas expansion for outpainting.

use std::fmt;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifact::Artifact;
use crate::error::RasterError;
use crate::raster::geometry::{scale_rect, Rect, Size};

/// Largest width or height an expanded canvas may reach.
pub const MAX_CANVAS_DIMENSION: u32 = 16_384;

/// Which edges receive new blank pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandDirection {
    All,
    Horizontal,
    Vertical,
    Top,
    Right,
    Bottom,
    Left,
}

/// Pixels added on each edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl ExpandDirection {
    pub fn margins(self, pixels: u32) -> Margins {
        let mut m = Margins::default();
        match self {
            Self::All => {
                m.top = pixels;
                m.right = pixels;
                m.bottom = pixels;
                m.left = pixels;
            }
            Self::Horizontal => {
                m.left = pixels;
                m.right = pixels;
            }
            Self::Vertical => {
                m.top = pixels;
                m.bottom = pixels;
            }
            Self::Top => m.top = pixels,
            Self::Right => m.right = pixels,
            Self::Bottom => m.bottom = pixels,
            Self::Left => m.left = pixels,
        }
        m
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all sides",
            Self::Horizontal => "left and right",
            Self::Vertical => "top and bottom",
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for ExpandDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extract the displayed rectangle at natural resolution.
///
/// The output buffer is allocated at `region * pixel_ratio`, so a crop made
/// on a high-density display is not rendered at the lower CSS resolution.
pub fn crop_artifact(
    artifact: &Artifact,
    displayed: Rect,
    display: Size,
    natural: Size,
    pixel_ratio: f64,
) -> Result<Artifact, RasterError> {
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
        return Err(RasterError::InvalidPixelRatio(pixel_ratio));
    }
    let (x, y, width, height) = scale_rect(displayed, display, natural)?;

    let source = artifact.decode()?;
    let (src_w, src_h) = source.dimensions();
    if x >= src_w || y >= src_h {
        return Err(RasterError::InvalidRect);
    }
    let width = width.min(src_w - x);
    let height = height.min(src_h - y);

    let mut cropped = source.crop_imm(x, y, width, height);
    if (pixel_ratio - 1.0).abs() > f64::EPSILON {
        let target_w = ((width as f64) * pixel_ratio).round().max(1.0) as u32;
        let target_h = ((height as f64) * pixel_ratio).round().max(1.0) as u32;
        cropped = cropped.resize_exact(target_w, target_h, FilterType::Lanczos3);
    }
    debug!(
        "Cropped {} to {}x{} at ({}, {}), output {}x{}",
        artifact.filename(),
        width,
        height,
        x,
        y,
        cropped.width(),
        cropped.height()
    );

    Artifact::from_image(&cropped, format!("cropped-{}.png", artifact.file_stem()))
}

/// Grow the canvas by `pixels` on the edges named by `direction`.
///
/// Existing pixels are copied unchanged at the new offset; the added area is
/// fully transparent. The result is the *input* of an outpainting call.
pub fn expand_canvas(
    artifact: &Artifact,
    pixels: u32,
    direction: ExpandDirection,
) -> Result<Artifact, RasterError> {
    let source = artifact.decode()?.to_rgba8();
    let expanded = expand_rgba(&source, direction.margins(pixels))?;
    debug!(
        "Expanded {} from {}x{} to {}x{} ({})",
        artifact.filename(),
        source.width(),
        source.height(),
        expanded.width(),
        expanded.height(),
        direction
    );
    Artifact::from_image(
        &DynamicImage::ImageRgba8(expanded),
        format!("expanded-{}.png", artifact.file_stem()),
    )
}

fn expand_rgba(source: &RgbaImage, margins: Margins) -> Result<RgbaImage, RasterError> {
    let width = u64::from(source.width()) + u64::from(margins.left) + u64::from(margins.right);
    let height = u64::from(source.height()) + u64::from(margins.top) + u64::from(margins.bottom);
    if width > u64::from(MAX_CANVAS_DIMENSION) || height > u64::from(MAX_CANVAS_DIMENSION) {
        return Err(RasterError::CanvasTooLarge {
            width,
            height,
            max: MAX_CANVAS_DIMENSION,
        });
    }

    // Both sides fit in u32 after the check above.
    let mut canvas = RgbaImage::new(width as u32, height as u32);
    imageops::replace(
        &mut canvas,
        source,
        i64::from(margins.left),
        i64::from(margins.top),
    );
    Ok(canvas)
}
