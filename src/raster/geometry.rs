//! Display-space to natural-space coordinate mapping.
//!
//! The editor shows artifacts scaled to fit the viewport, so every pointer
//! position arrives in *display* pixels. The model and the raster routines
//! work in *natural* pixels (the artifact's own resolution).

use serde::{Deserialize, Serialize};

use crate::error::RasterError;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A position in either display or natural space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A localized-edit focus point in natural pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
}

/// Map a display-space point to natural space: `round(p * natural / display)`.
pub fn scale_point(point: Point, display: Size, natural: Size) -> Result<Point, RasterError> {
    if display.is_empty() || natural.is_empty() {
        return Err(RasterError::EmptySize);
    }
    let sx = natural.width as f64 / display.width as f64;
    let sy = natural.height as f64 / display.height as f64;
    Ok(Point {
        x: (point.x * sx).round(),
        y: (point.y * sy).round(),
    })
}

/// Scale a click into a hotspot, clamped to the last natural pixel.
pub fn hotspot_from_display(
    point: Point,
    display: Size,
    natural: Size,
) -> Result<Hotspot, RasterError> {
    let scaled = scale_point(point, display, natural)?;
    let max_x = (natural.width - 1) as f64;
    let max_y = (natural.height - 1) as f64;
    Ok(Hotspot {
        x: scaled.x.clamp(0.0, max_x) as u32,
        y: scaled.y.clamp(0.0, max_y) as u32,
    })
}

/// Map a display rectangle to a natural-space pixel region `(x, y, width, height)`.
///
/// Both corners are scaled independently and clamped to the image; an
/// empty result is rejected.
pub fn scale_rect(
    rect: Rect,
    display: Size,
    natural: Size,
) -> Result<(u32, u32, u32, u32), RasterError> {
    let top_left = scale_point(Point::new(rect.x, rect.y), display, natural)?;
    let bottom_right = scale_point(
        Point::new(rect.x + rect.width, rect.y + rect.height),
        display,
        natural,
    )?;

    let x0 = top_left.x.clamp(0.0, natural.width as f64) as u32;
    let y0 = top_left.y.clamp(0.0, natural.height as f64) as u32;
    let x1 = bottom_right.x.clamp(0.0, natural.width as f64) as u32;
    let y1 = bottom_right.y.clamp(0.0, natural.height as f64) as u32;

    if x1 <= x0 || y1 <= y0 {
        return Err(RasterError::InvalidRect);
    }
    Ok((x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_point_identity() {
        let size = Size::new(640, 480);
        for p in [Point::new(0.0, 0.0), Point::new(12.0, 479.0), Point::new(639.0, 3.0)] {
            assert_eq!(scale_point(p, size, size).unwrap(), p);
        }
    }

    #[test]
    fn test_scale_point_origin_stays_at_origin() {
        let origin = Point::new(0.0, 0.0);
        let scaled = scale_point(origin, Size::new(300, 200), Size::new(1920, 1080)).unwrap();
        assert_eq!(scaled, origin);
    }

    #[test]
    fn test_scale_point_non_uniform() {
        // x doubles, y triples
        let scaled =
            scale_point(Point::new(10.0, 10.0), Size::new(100, 100), Size::new(200, 300)).unwrap();
        assert_eq!(scaled, Point::new(20.0, 30.0));
    }

    #[test]
    fn test_scale_point_rounds() {
        let scaled =
            scale_point(Point::new(1.0, 1.0), Size::new(3, 3), Size::new(4, 5)).unwrap();
        // 1.333.. -> 1, 1.666.. -> 2
        assert_eq!(scaled, Point::new(1.0, 2.0));
    }

    #[test]
    fn test_scale_point_rejects_zero_sizes() {
        let p = Point::new(1.0, 1.0);
        assert_eq!(
            scale_point(p, Size::new(0, 10), Size::new(10, 10)),
            Err(RasterError::EmptySize)
        );
        assert_eq!(
            scale_point(p, Size::new(10, 10), Size::new(10, 0)),
            Err(RasterError::EmptySize)
        );
    }

    #[test]
    fn test_hotspot_clamps_to_image() {
        let hotspot =
            hotspot_from_display(Point::new(100.0, 50.0), Size::new(100, 50), Size::new(400, 200))
                .unwrap();
        assert_eq!(hotspot, Hotspot { x: 399, y: 199 });
    }

    #[test]
    fn test_scale_rect() {
        let region = scale_rect(
            Rect::new(10.0, 20.0, 30.0, 40.0),
            Size::new(100, 100),
            Size::new(200, 200),
        )
        .unwrap();
        assert_eq!(region, (20, 40, 60, 80));
    }

    #[test]
    fn test_scale_rect_rejects_empty() {
        let result = scale_rect(
            Rect::new(10.0, 10.0, 0.0, 5.0),
            Size::new(100, 100),
            Size::new(100, 100),
        );
        assert_eq!(result, Err(RasterError::InvalidRect));
    }
}
