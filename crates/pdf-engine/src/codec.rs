//! Image codec collaborator
//!
//! Probes and decodes uploaded images (signatures, single-image pages) and
//! encodes raster surfaces into a compact payload for embedding.

use crate::{normalize_rotation, PdfEngineError, RgbaImage};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

const JPEG_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: RasterFormat,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: RasterFormat,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn detect(bytes: &[u8]) -> Result<RasterFormat, PdfEngineError> {
    let format = image::guess_format(bytes)?;
    RasterFormat::from_image_format(format)
        .ok_or_else(|| PdfEngineError::Backend(format!("unsupported image format {format:?}")))
}

/// Decodes just enough to report format, dimensions and transparency.
pub fn probe(bytes: &[u8]) -> Result<ImageInfo, PdfEngineError> {
    let format = detect(bytes)?;
    let image = image::load_from_memory(bytes)?;

    Ok(ImageInfo {
        format,
        width: image.width(),
        height: image.height(),
        has_alpha: has_transparency(&image.to_rgba8()),
    })
}

pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PdfEngineError> {
    detect(bytes)?;
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn has_transparency(image: &RgbaImage) -> bool {
    image.pixels().any(|pixel| pixel.0[3] < 255)
}

/// PNG when any pixel is translucent, JPEG otherwise.
pub fn encode_surface(surface: &RgbaImage) -> Result<EncodedImage, PdfEngineError> {
    let mut bytes = Cursor::new(Vec::new());
    let format = if has_transparency(surface) {
        DynamicImage::ImageRgba8(surface.clone()).write_to(&mut bytes, ImageFormat::Png)?;
        RasterFormat::Png
    } else {
        let rgb = DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
        encoder.encode_image(&rgb)?;
        RasterFormat::Jpeg
    };

    Ok(EncodedImage {
        format,
        bytes: bytes.into_inner(),
        width: surface.width(),
        height: surface.height(),
    })
}

/// Renders a single-image source as a page raster, rotated clockwise.
pub fn render_image_page(
    bytes: &[u8],
    scale: f32,
    rotation: u16,
) -> Result<RgbaImage, PdfEngineError> {
    let decoded = decode_rgba(bytes)?;
    let scale = if scale <= 0.0 { 1.0 } else { scale };
    let width = (decoded.width() as f32 * scale).round().max(1.0) as u32;
    let height = (decoded.height() as f32 * scale).round().max(1.0) as u32;
    let scaled = if (width, height) == decoded.dimensions() {
        decoded
    } else {
        image::imageops::resize(&decoded, width, height, image::imageops::FilterType::Triangle)
    };

    Ok(rotate_clockwise(&scaled, rotation))
}

pub fn rotate_clockwise(image: &RgbaImage, rotation: u16) -> RgbaImage {
    match normalize_rotation(rotation as i32) {
        90 => image::imageops::rotate90(image),
        180 => image::imageops::rotate180(image),
        270 => image::imageops::rotate270(image),
        _ => image.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn opaque_surface_encodes_as_jpeg() {
        let surface = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));
        let encoded = encode_surface(&surface).expect("encode should succeed");

        assert_eq!(encoded.format, RasterFormat::Jpeg);
        assert_eq!((encoded.width, encoded.height), (8, 4));
        let info = probe(&encoded.bytes).expect("probe should succeed");
        assert_eq!(info.format, RasterFormat::Jpeg);
        assert!(!info.has_alpha);
    }

    #[test]
    fn translucent_surface_encodes_as_png() {
        let mut surface = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        surface.put_pixel(1, 1, Rgba([0, 0, 0, 0]));

        let encoded = encode_surface(&surface).expect("encode should succeed");
        assert_eq!(encoded.format, RasterFormat::Png);
        assert!(probe(&encoded.bytes).expect("probe should succeed").has_alpha);
    }

    #[test]
    fn image_page_rotation_swaps_dimensions() {
        let surface = RgbaImage::from_pixel(6, 3, Rgba([255, 0, 0, 128]));
        let encoded = encode_surface(&surface).expect("encode should succeed");

        let page = render_image_page(&encoded.bytes, 2.0, 90).expect("render should succeed");
        assert_eq!(page.dimensions(), (6, 12));
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert!(probe(b"definitely not an image").is_err());
    }
}
