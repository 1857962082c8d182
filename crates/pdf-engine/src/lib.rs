use image::{ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod codec;
pub mod writer;

pub use codec::{EncodedImage, ImageInfo, RasterFormat};
pub use writer::{
    DocumentWriter, FontHandle, FontRequest, ImageHandle, LopdfWriter, OutputPage, Placement,
    Rgb, StandardFont, TextStyle,
};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Unrotated MediaBox size plus the page's own `/Rotate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
    pub rotation: u16,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0, rotation: 0 };

    /// Size as displayed once `extra_rotation` is applied on top of the intrinsic one.
    pub fn displayed(&self, extra_rotation: u16) -> (f32, f32) {
        if normalize_rotation(self.rotation as i32 + extra_rotation as i32) % 180 == 90 {
            (self.height_pt, self.width_pt)
        } else {
            (self.width_pt, self.height_pt)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
    /// Clockwise view rotation in degrees, added to the page's own rotation.
    pub rotation: u16,
    pub clip: Option<ClipRect>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0, rotation: 0, clip: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self { width_px: 256, height_px: 256 }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("font {0} is not available to this writer")]
    FontUnavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Document rendering collaborator.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        rotation: u16,
        target: ThumbnailSize,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

pub fn normalize_rotation(degrees: i32) -> u16 {
    degrees.rem_euclid(360) as u16
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes the handle was opened from.
    pub fn bytes(&self, handle: DocumentHandle) -> Result<&[u8], PdfEngineError> {
        Ok(&self.record(handle)?.bytes)
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            sizes.push(page_size_of(&doc, dict));
        }

        if sizes.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Looks a key up on the page or, failing that, on its `/Pages` ancestors.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

pub(crate) fn page_size_of(doc: &Document, page: &Dictionary) -> PageSize {
    let (width_pt, height_pt) = inherited_attribute(doc, page, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| {
            if array.len() != 4 {
                return None;
            }
            let x0 = array[0].as_float().ok()?;
            let y0 = array[1].as_float().ok()?;
            let x1 = array[2].as_float().ok()?;
            let y1 = array[3].as_float().ok()?;
            Some(((x1 - x0).abs(), (y1 - y0).abs()))
        })
        .unwrap_or((PageSize::LETTER.width_pt, PageSize::LETTER.height_pt));

    let rotation = inherited_attribute(doc, page, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(|degrees| normalize_rotation(degrees as i32))
        .unwrap_or(0);

    PageSize { width_pt, height_pt, rotation }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = page_sizes.len(), "opened document");
        self.docs.insert(handle, DocumentRecord { bytes, page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };
        let (display_width, display_height) = page_size.displayed(request.rotation);

        let mut width = (display_width * scale).round().max(1.0) as u32;
        let mut height = (display_height * scale).round().max(1.0) as u32;

        if let Some(clip) = request.clip {
            width = (clip.width * scale).round().max(1.0) as u32;
            height = (clip.height * scale).round().max(1.0) as u32;
        }

        Ok(blank_page(width, height))
    }

    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        rotation: u16,
        target: ThumbnailSize,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page = self.render_page(
            handle,
            RenderRequest { page_index, scale: 0.25, rotation, clip: None },
        )?;

        Ok(image::imageops::thumbnail(&page, target.width_px.max(1), target.height_px.max(1)))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

fn blank_page(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    if width >= 4 && height >= 4 {
        for x in 0..width {
            image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
            image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
        }
        for y in 0..height {
            image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
            image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
        }
    }

    image
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Builds a minimal uncompressed PDF with one empty page per size.
pub fn blank_pdf(sizes: &[(f32, f32)]) -> Result<Vec<u8>, PdfEngineError> {
    use lopdf::{dictionary, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(sizes.len());

    for &(width, height) in sizes {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {},
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf_bytes() -> Vec<u8> {
        blank_pdf(&[(612.0, 792.0), (300.0, 200.0)]).expect("fixture should build")
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(sample_pdf_bytes())).expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 2);
        let size = engine.page_size(handle, 1).expect("size should resolve");
        assert_eq!((size.width_pt, size.height_pt, size.rotation), (300.0, 200.0, 0));
    }

    #[test]
    fn render_swaps_dimensions_for_quarter_turns() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(sample_pdf_bytes())).expect("open should succeed");

        let upright = engine
            .render_page(handle, RenderRequest { page_index: 1, ..Default::default() })
            .expect("render should succeed");
        let turned = engine
            .render_page(
                handle,
                RenderRequest { page_index: 1, rotation: 90, ..Default::default() },
            )
            .expect("render should succeed");

        assert_eq!(upright.dimensions(), (300, 200));
        assert_eq!(turned.dimensions(), (200, 300));
    }

    #[test]
    fn render_thumbnail_produces_non_empty_image() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(sample_pdf_bytes())).expect("open should succeed");

        let image = engine
            .render_thumbnail(handle, 0, 0, ThumbnailSize { width_px: 80, height_px: 80 })
            .expect("thumbnail should render");

        assert!(image.width() > 0);
        assert!(image.height() > 0);
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"not a pdf".to_vec()))
            .expect_err("garbage should not parse");

        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn encrypted_marker_is_rejected() {
        let mut bytes = sample_pdf_bytes();
        bytes.extend_from_slice(b"\n% /Encrypt\n");
        let mut engine = LopdfEngine::new();

        let err = engine.open(OpenSource::Bytes(bytes)).expect_err("should be rejected");
        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn displayed_size_accounts_for_intrinsic_rotation() {
        let size = PageSize { width_pt: 100.0, height_pt: 50.0, rotation: 90 };
        assert_eq!(size.displayed(0), (50.0, 100.0));
        assert_eq!(size.displayed(90), (100.0, 50.0));
        assert_eq!(normalize_rotation(-90), 270);
    }
}
