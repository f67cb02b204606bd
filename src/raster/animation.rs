//! Animated GIF assembly from a sequence of artifacts.

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, Frame};

use crate::artifact::Artifact;
use crate::error::RasterError;

/// Build a looping GIF, one frame per artifact, each shown for `delay_ms`.
///
/// Frames are resized to the first frame's dimensions.
pub fn assemble_gif(
    frames: &[Artifact],
    delay_ms: u32,
    filename: impl Into<String>,
) -> Result<Artifact, RasterError> {
    let first = frames.first().ok_or(RasterError::EmptySize)?;
    let size = first.dimensions()?;

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| RasterError::Encode(e.to_string()))?;

        for artifact in frames {
            let mut rgba = artifact.decode()?.to_rgba8();
            if rgba.dimensions() != (size.width, size.height) {
                rgba = image::imageops::resize(&rgba, size.width, size.height, FilterType::Triangle);
            }
            let frame = Frame::from_parts(rgba, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
            encoder
                .encode_frame(frame)
                .map_err(|e| RasterError::Encode(e.to_string()))?;
        }
    }

    Ok(Artifact::new(bytes, filename, "image/gif"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::geometry::Size;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn solid(width: u32, height: u32, shade: u8) -> Artifact {
        let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
        Artifact::from_image(&DynamicImage::ImageRgba8(img), "frame.png").unwrap()
    }

    #[test]
    fn test_assemble_gif_frame_count_and_size() {
        let frames = vec![solid(16, 8, 0), solid(32, 16, 128), solid(16, 8, 255)];
        let gif = assemble_gif(&frames, 500, "history.gif").unwrap();

        assert_eq!(gif.mime_type(), "image/gif");
        assert_eq!(gif.dimensions().unwrap(), Size::new(16, 8));

        let decoder = GifDecoder::new(Cursor::new(gif.bytes().to_vec())).unwrap();
        let decoded = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn test_assemble_gif_requires_frames() {
        assert_eq!(assemble_gif(&[], 100, "x.gif").unwrap_err(), RasterError::EmptySize);
    }
}
