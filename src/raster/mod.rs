//! Pure raster and geometry helpers that prepare model inputs and
//! normalize model outputs.

pub mod animation;
pub mod archive;
pub mod codec;
pub mod compose;
pub mod data_url;
pub mod geometry;
pub mod mask;

pub use animation::assemble_gif;
pub use archive::package_zip;
pub use compose::{crop_artifact, expand_canvas, ExpandDirection, Margins};
pub use data_url::{decode_data_url, encode_data_url, DecodedDataUrl};
pub use geometry::{hotspot_from_display, scale_point, scale_rect, Hotspot, Point, Rect, Size};
pub use mask::{rasterize_mask, Mask};
