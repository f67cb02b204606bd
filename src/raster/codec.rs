//! PNG encoding and format-sniffing decode helpers.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::RasterError;
use crate::raster::geometry::Size;

/// Decode any supported image format, guessing it from the magic bytes.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RasterError> {
    image::load_from_memory(bytes).map_err(|e| RasterError::Decode(e.to_string()))
}

/// Read width and height from the header only.
pub fn read_dimensions(bytes: &[u8]) -> Result<Size, RasterError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RasterError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| RasterError::Decode(e.to_string()))?;
    Ok(Size::new(width, height))
}

/// Encode as PNG; lossless, keeps transparency for expanded canvases.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, RasterError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}
