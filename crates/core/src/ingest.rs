//! File ingestion
//!
//! Classifies incoming files, opens them through the rendering collaborator
//! and turns each source page into a rendered [`PageEntry`]. Failures are
//! per file: the caller reports them and carries on with the batch.

use crate::config::EditorConfig;
use crate::document::{PageEntry, PageId, SourceDocument, SourceKind};
use crate::error::{EditorError, EditorResult};
use pdf_engine::codec;
use pdf_engine::{
    OpenSource, PageSize, PdfEngine, RasterFormat, RenderRequest, RgbaImage, ThumbnailSize,
};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image(RasterFormat),
}

/// Sniffs the content first and falls back to the file extension.
pub fn classify(file: &IncomingFile) -> Option<FileKind> {
    let head = &file.bytes[..file.bytes.len().min(1024)];
    if head.windows(5).any(|window| window == b"%PDF-") {
        return Some(FileKind::Pdf);
    }
    if let Ok(format) = image::guess_format(&file.bytes) {
        if let Some(raster) = RasterFormat::from_image_format(format) {
            return Some(FileKind::Image(raster));
        }
    }

    let extension = Path::new(&file.name)
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())?;
    match extension.as_str() {
        "pdf" => Some(FileKind::Pdf),
        "png" => Some(FileKind::Image(RasterFormat::Png)),
        "jpg" | "jpeg" => Some(FileKind::Image(RasterFormat::Jpeg)),
        _ => None,
    }
}

/// Full-resolution and thumbnail renders of one page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub raster: RgbaImage,
    pub thumbnail: RgbaImage,
}

/// Renders source pages at the configured scale.
pub struct PageRasterizer<'a> {
    pub engine: &'a dyn PdfEngine,
    pub config: &'a EditorConfig,
}

impl PageRasterizer<'_> {
    pub fn render(
        &self,
        source: &SourceDocument,
        page_index: u32,
        rotation: u16,
    ) -> EditorResult<RenderedPage> {
        let target = ThumbnailSize {
            width_px: self.config.thumbnail_width,
            height_px: self.config.thumbnail_height,
        };

        match source.kind {
            SourceKind::Pdf { handle } => {
                let raster = self.engine.render_page(
                    handle,
                    RenderRequest {
                        page_index,
                        scale: self.config.render_scale,
                        rotation,
                        clip: None,
                    },
                )?;
                let thumbnail =
                    self.engine.render_thumbnail(handle, page_index, rotation, target)?;
                Ok(RenderedPage { raster, thumbnail })
            }
            SourceKind::Image { .. } => {
                let raster =
                    codec::render_image_page(&source.bytes, self.config.render_scale, rotation)?;
                let thumbnail = fit_thumbnail(&raster, target);
                Ok(RenderedPage { raster, thumbnail })
            }
        }
    }

    /// Builds a fresh page entry for `source_page_index` of `source`.
    pub fn entry(
        &self,
        source: &SourceDocument,
        source_page_index: u32,
        rotation: u16,
    ) -> EditorResult<PageEntry> {
        self.entry_with_id(PageId::new(), source, source_page_index, rotation)
    }

    pub fn entry_with_id(
        &self,
        id: PageId,
        source: &SourceDocument,
        source_page_index: u32,
        rotation: u16,
    ) -> EditorResult<PageEntry> {
        let page_size = source.page_size(source_page_index)?;
        let rendered = self.render(source, source_page_index, rotation)?;
        Ok(PageEntry {
            id,
            source_id: source.id,
            source_page_index,
            source_name: source.name.clone(),
            rotation,
            is_single_image_page: source.is_image(),
            page_size,
            raster: Arc::new(rendered.raster),
            thumbnail: Arc::new(rendered.thumbnail),
        })
    }
}

fn fit_thumbnail(raster: &RgbaImage, target: ThumbnailSize) -> RgbaImage {
    let (width, height) = raster.dimensions();
    let scale = (target.width_px as f32 / width.max(1) as f32)
        .min(target.height_px as f32 / height.max(1) as f32)
        .min(1.0);
    let thumb_width = ((width as f32 * scale).round() as u32).max(1);
    let thumb_height = ((height as f32 * scale).round() as u32).max(1);
    image::imageops::thumbnail(raster, thumb_width, thumb_height)
}

/// Opens one incoming file as a source document with a fresh id.
pub fn open_source(
    engine: &mut dyn PdfEngine,
    config: &EditorConfig,
    id: u64,
    file: IncomingFile,
) -> EditorResult<SourceDocument> {
    let size = file.bytes.len() as u64;
    if size > config.max_file_size {
        return Err(EditorError::FileTooLarge {
            name: file.name,
            size,
            limit: config.max_file_size,
        });
    }

    let kind = classify(&file).ok_or_else(|| EditorError::UnsupportedFile(file.name.clone()))?;
    match kind {
        FileKind::Pdf => {
            let bytes = Arc::new(file.bytes);
            let handle = engine.open(OpenSource::Bytes(bytes.as_ref().clone()))?;
            let measured = engine.page_count(handle).and_then(|page_count| {
                (0..page_count)
                    .map(|index| engine.page_size(handle, index))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|sizes| (page_count, sizes))
            });
            let (page_count, page_sizes) = match measured {
                Ok(measured) => measured,
                Err(err) => {
                    if let Err(close_err) = engine.close(handle) {
                        tracing::warn!(error = %close_err, "failed to close source");
                    }
                    return Err(err.into());
                }
            };
            tracing::info!(name = %file.name, pages = page_count, "opened PDF source");
            Ok(SourceDocument {
                id,
                name: file.name,
                bytes,
                kind: SourceKind::Pdf { handle },
                page_sizes,
            })
        }
        FileKind::Image(format) => {
            let info = codec::probe(&file.bytes)?;
            tracing::info!(
                name = %file.name,
                width = info.width,
                height = info.height,
                "opened image source"
            );
            Ok(SourceDocument {
                id,
                name: file.name,
                bytes: Arc::new(file.bytes),
                kind: SourceKind::Image { format, width: info.width, height: info.height },
                page_sizes: vec![PageSize {
                    width_pt: info.width as f32,
                    height_pt: info.height as f32,
                    rotation: 0,
                }],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::png_bytes;
    use pdf_engine::{DocumentHandle, LopdfEngine, PdfEngineError};

    #[test]
    fn classify_sniffs_content_before_extension() {
        let pdf = pdf_engine::blank_pdf(&[(100.0, 100.0)]).expect("fixture should build");
        assert_eq!(classify(&IncomingFile::new("scan.png", pdf)), Some(FileKind::Pdf));
        assert_eq!(
            classify(&IncomingFile::new("photo", png_bytes(4, 4))),
            Some(FileKind::Image(RasterFormat::Png))
        );
        assert_eq!(classify(&IncomingFile::new("notes.txt", b"hello".to_vec())), None);
    }

    /// Opens documents normally but cannot measure their pages.
    #[derive(Default)]
    struct UnmeasurableEngine {
        inner: LopdfEngine,
        closed: usize,
    }

    impl PdfEngine for UnmeasurableEngine {
        fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
            self.inner.open(source)
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
            self.inner.page_count(handle)
        }

        fn page_size(&self, _: DocumentHandle, _: u32) -> Result<PageSize, PdfEngineError> {
            Err(PdfEngineError::Backend("no media box".to_owned()))
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<RgbaImage, PdfEngineError> {
            self.inner.render_page(handle, request)
        }

        fn render_thumbnail(
            &self,
            handle: DocumentHandle,
            page_index: u32,
            rotation: u16,
            target: ThumbnailSize,
        ) -> Result<RgbaImage, PdfEngineError> {
            self.inner.render_thumbnail(handle, page_index, rotation, target)
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
            self.closed += 1;
            self.inner.close(handle)
        }
    }

    #[test]
    fn failed_page_measurement_closes_the_handle() {
        let mut engine = UnmeasurableEngine::default();
        let config = EditorConfig::default();
        let bytes = pdf_engine::blank_pdf(&[(100.0, 50.0)]).expect("fixture should build");

        let err = open_source(&mut engine, &config, 3, IncomingFile::new("a.pdf", bytes))
            .expect_err("unmeasurable pages should fail");
        assert!(matches!(err, EditorError::Engine(PdfEngineError::Backend(_))));
        assert_eq!(engine.closed, 1);
    }

    #[test]
    fn oversize_file_is_rejected() {
        let mut engine = LopdfEngine::new();
        let config = EditorConfig { max_file_size: 4, ..EditorConfig::default() };

        let err = open_source(&mut engine, &config, 1, IncomingFile::new("big.pdf", vec![0; 8]))
            .expect_err("oversize file should fail");
        assert!(matches!(err, EditorError::FileTooLarge { size: 8, limit: 4, .. }));
    }

    #[test]
    fn pdf_pages_render_at_configured_scale() {
        let mut engine = LopdfEngine::new();
        let config = EditorConfig { render_scale: 2.0, ..EditorConfig::default() };
        let bytes = pdf_engine::blank_pdf(&[(100.0, 50.0)]).expect("fixture should build");

        let source = open_source(&mut engine, &config, 7, IncomingFile::new("a.pdf", bytes))
            .expect("open should succeed");
        let rasterizer = PageRasterizer { engine: &engine, config: &config };
        let entry = rasterizer.entry(&source, 0, 90).expect("render should succeed");

        assert_eq!(entry.source_id, 7);
        assert_eq!(entry.raster_size(), (100, 200));
        assert_eq!(entry.displayed_size(), (50.0, 100.0));
        assert!(!entry.is_single_image_page);
    }

    #[test]
    fn image_becomes_single_page_source() {
        let mut engine = LopdfEngine::new();
        let config = EditorConfig { render_scale: 1.0, ..EditorConfig::default() };

        let source =
            open_source(&mut engine, &config, 2, IncomingFile::new("sig.png", png_bytes(30, 10)))
                .expect("open should succeed");
        let rasterizer = PageRasterizer { engine: &engine, config: &config };
        let entry = rasterizer.entry(&source, 0, 0).expect("render should succeed");

        assert_eq!(source.page_count(), 1);
        assert!(entry.is_single_image_page);
        assert_eq!(entry.raster_size(), (30, 10));
        assert!(entry.thumbnail.width() <= config.thumbnail_width);
    }
}
