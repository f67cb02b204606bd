//! Immutable image artifacts.
//!
//! Every upload, generation and successful edit produces a new [`Artifact`].
//! Bytes live behind an `Arc`, so clones share the buffer and never copy it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::DynamicImage;

use crate::error::RasterError;
use crate::raster::codec;
use crate::raster::data_url::{decode_data_url, encode_data_url};
use crate::raster::geometry::Size;

static NEXT_ARTIFACT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an artifact instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(u64);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact-{}", self.0)
    }
}

#[derive(Clone)]
pub struct Artifact {
    id: ArtifactId,
    bytes: Arc<[u8]>,
    filename: String,
    mime_type: String,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: ArtifactId(NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed)),
            bytes: bytes.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Build an artifact from a `data:` URL (e.g. a canvas export or a FileReader result).
    pub fn from_data_url(data_url: &str, filename: impl Into<String>) -> Result<Self, RasterError> {
        let decoded = decode_data_url(data_url)?;
        Ok(Self::new(decoded.bytes, filename, decoded.mime_type))
    }

    /// Encode a decoded image as a PNG artifact.
    pub fn from_image(image: &DynamicImage, filename: impl Into<String>) -> Result<Self, RasterError> {
        let bytes = codec::encode_png(image)?;
        Ok(Self::new(bytes, filename, "image/png"))
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        encode_data_url(&self.mime_type, &self.bytes)
    }

    pub fn decode(&self) -> Result<DynamicImage, RasterError> {
        codec::decode_image(&self.bytes)
    }

    /// Natural size, read from the image header without a full decode.
    pub fn dimensions(&self) -> Result<Size, RasterError> {
        codec::read_dimensions(&self.bytes)
    }

    /// Filename without its final extension.
    pub fn file_stem(&self) -> &str {
        match self.filename.rfind('.') {
            Some(0) | None => &self.filename,
            Some(pos) => &self.filename[..pos],
        }
    }

    /// Same bytes under a new name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Rename a model result after the artifact it was derived from,
    /// keeping the extension consistent with this artifact's MIME type.
    pub fn named_after(self, source: &Artifact) -> Self {
        let filename = format!("{}.{}", source.file_stem(), extension_for_mime(&self.mime_type));
        self.with_filename(filename)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// File extension conventionally used for a MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "application/zip" => "zip",
        _ => "bin",
    }
}
