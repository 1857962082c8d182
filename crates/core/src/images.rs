//! Shared image store
//!
//! Signature images are decoded once and referenced by id from annotations,
//! so snapshots and copies of an annotation never duplicate pixel data.

use crate::error::{EditorError, EditorResult};
use pdf_engine::codec::{self, EncodedImage, RasterFormat};
use pdf_engine::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(uuid::Uuid);

impl ImageId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A decoded image together with the bytes it came from.
#[derive(Debug)]
pub struct StoredImage {
    pub encoded: EncodedImage,
    pub raster: RgbaImage,
}

impl StoredImage {
    /// Width over height of the natural image size.
    pub fn aspect_ratio(&self) -> f32 {
        self.raster.width().max(1) as f32 / self.raster.height().max(1) as f32
    }
}

#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: HashMap<ImageId, Arc<StoredImage>>,
    by_content: HashMap<u64, Vec<ImageId>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and stores an image, reusing the existing id when identical
    /// bytes were registered before.
    pub fn register(&mut self, bytes: &[u8]) -> EditorResult<ImageId> {
        let digest = content_digest(bytes);
        if let Some(existing) = self.by_content.get(&digest).and_then(|ids| {
            ids.iter().copied().find(|id| {
                self.images.get(id).is_some_and(|image| image.encoded.bytes == bytes)
            })
        }) {
            return Ok(existing);
        }

        let info = codec::probe(bytes)?;
        let raster = codec::decode_rgba(bytes)?;
        let id = ImageId::new();
        let stored = StoredImage {
            encoded: EncodedImage {
                format: info.format,
                bytes: bytes.to_vec(),
                width: info.width,
                height: info.height,
            },
            raster,
        };

        tracing::debug!(%id, width = info.width, height = info.height, "registered image");
        self.images.insert(id, Arc::new(stored));
        self.by_content.entry(digest).or_default().push(id);
        Ok(id)
    }

    pub fn get(&self, id: ImageId) -> Option<Arc<StoredImage>> {
        self.images.get(&id).cloned()
    }

    pub fn require(&self, id: ImageId) -> EditorResult<Arc<StoredImage>> {
        self.get(id).ok_or_else(|| EditorError::MissingImage(id.to_string()))
    }

    pub fn format(&self, id: ImageId) -> Option<RasterFormat> {
        self.images.get(&id).map(|image| image.encoded.format)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.by_content.clear();
    }
}

fn content_digest(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    pub(crate) fn dummy_image_id() -> ImageId {
        ImageId::new()
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([20, 20, 160, 200]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("png should encode");
        bytes.into_inner()
    }

    #[test]
    fn identical_bytes_share_an_id() {
        let mut registry = ImageRegistry::new();
        let bytes = png_bytes(40, 20);

        let first = registry.register(&bytes).expect("register should succeed");
        let second = registry.register(&bytes).expect("register should succeed");

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        let stored = registry.require(first).expect("image should be stored");
        assert_eq!(stored.aspect_ratio(), 2.0);
        assert_eq!(registry.format(first), Some(RasterFormat::Png));
    }

    #[test]
    fn garbage_is_rejected() {
        let mut registry = ImageRegistry::new();
        assert!(registry.register(b"definitely not an image").is_err());
        assert!(registry.is_empty());
    }
}
