//! Lasso selection to inpainting mask.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point as PixelPoint;

use crate::artifact::Artifact;
use crate::error::RasterError;
use crate::raster::geometry::{scale_point, Point, Size};

pub const MASK_FOREGROUND: Luma<u8> = Luma([255]);
pub const MASK_BACKGROUND: Luma<u8> = Luma([0]);

/// Black/white raster at the artifact's natural resolution; white is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    bitmap: GrayImage,
}

impl Mask {
    pub fn bitmap(&self) -> &GrayImage {
        &self.bitmap
    }

    pub fn size(&self) -> Size {
        Size::new(self.bitmap.width(), self.bitmap.height())
    }

    pub fn is_selected(&self, x: u32, y: u32) -> bool {
        self.bitmap.get_pixel_checked(x, y) == Some(&MASK_FOREGROUND)
    }

    pub fn selected_pixels(&self) -> usize {
        self.bitmap.pixels().filter(|p| **p == MASK_FOREGROUND).count()
    }

    /// PNG artifact suitable as the model's mask input.
    pub fn to_artifact(&self) -> Result<Artifact, RasterError> {
        Artifact::from_image(&DynamicImage::ImageLuma8(self.bitmap.clone()), "mask.png")
    }
}

/// Rasterize a closed lasso polygon.
///
/// Each display-space vertex is scaled into natural space first and the fill
/// happens there, so non-uniform scale factors do not distort the outline.
pub fn rasterize_mask(
    points: &[Point],
    display: Size,
    natural: Size,
) -> Result<Mask, RasterError> {
    if points.len() < 3 {
        return Err(RasterError::InsufficientPoints { got: points.len() });
    }

    let mut polygon: Vec<PixelPoint<i32>> = Vec::with_capacity(points.len());
    for point in points {
        let scaled = scale_point(*point, display, natural)?;
        let vertex = PixelPoint::new(scaled.x as i32, scaled.y as i32);
        if polygon.last() != Some(&vertex) {
            polygon.push(vertex);
        }
    }
    // The fill closes the outline itself and rejects an explicit closing vertex.
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() < 3 {
        return Err(RasterError::InsufficientPoints { got: polygon.len() });
    }

    let mut bitmap = GrayImage::from_pixel(natural.width, natural.height, MASK_BACKGROUND);
    draw_polygon_mut(&mut bitmap, &polygon, MASK_FOREGROUND);
    Ok(Mask { bitmap })
}
