//! Export projection
//!
//! Reads the final document model once and draws it through a
//! [`DocumentWriter`]. Annotation coordinates are raster pixels with a
//! top-left origin; the writer wants document units with a bottom-left
//! origin on the unrotated page, so every primitive goes through a
//! [`PageProjection`] first.

use crate::annotation::{Annotation, AnnotationKind, LINE_HEIGHT};
use crate::document::{Document, PageEntry, SourceId};
use crate::error::{EditorError, EditorResult};
use crate::fonts::{FontFamily, FontMetrics};
use crate::geometry::{Point, Rect};
use crate::images::{ImageId, ImageRegistry};
use crate::notice::Notice;
use crate::renderer::watermark_origin;
use crate::session::EditorSession;
use pdf_engine::{
    DocumentWriter, FontHandle, FontRequest, ImageHandle, LopdfWriter, OutputPage, PdfEngineError,
    Placement, Rgb, StandardFont, TextStyle,
};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing to export")]
    EmptyDocument,
    #[error("page {0} does not exist")]
    UnknownPage(usize),
    #[error("source document {0} is not loaded")]
    MissingSource(SourceId),
    #[error("signature image {0} is not registered")]
    MissingImage(ImageId),
    #[error("no usable font: {0}")]
    NoFont(String),
    #[error(transparent)]
    Writer(#[from] PdfEngineError),
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub annotation_count: usize,
    /// The source file was returned untouched.
    pub passthrough: bool,
}

/// Raster-to-document mapping for one page.
///
/// `width`/`height` are the unrotated page size and `rotation` the total
/// clockwise rotation the output page is shown with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageProjection {
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: u16,
}

impl PageProjection {
    pub fn for_page(page: &PageEntry) -> Self {
        let (raster_width, raster_height) = page.raster_size();
        let (display_width, display_height) = page.displayed_size();
        Self {
            scale_x: display_width / raster_width.max(1) as f32,
            scale_y: display_height / raster_height.max(1) as f32,
            width: page.page_size.width_pt,
            height: page.page_size.height_pt,
            rotation: page.effective_rotation(),
        }
    }

    /// Maps a raster point to unrotated page space.
    pub fn to_document(&self, point: Point) -> Point {
        let u = point.x * self.scale_x;
        let v = point.y * self.scale_y;
        let (x, y) = match self.rotation {
            90 => (v, u),
            180 => (self.width - u, v),
            270 => (self.width - v, self.height - u),
            _ => (u, self.height - v),
        };
        Point::new(x, y)
    }

    /// Placement of a raster rectangle, anchored at its displayed
    /// bottom-left corner.
    pub fn rect(&self, rect: Rect) -> Placement {
        let origin = self.to_document(Point::new(rect.x, rect.bottom()));
        Placement {
            x: origin.x,
            y: origin.y,
            width: rect.width * self.scale_x,
            height: rect.height * self.scale_y,
            rotation_deg: self.rotation as f32,
        }
    }

    /// Placement of a text baseline start, turned a further
    /// `extra_rotation_deg` counter-clockwise.
    pub fn text(&self, baseline: Point, extra_rotation_deg: f32) -> Placement {
        let origin = self.to_document(baseline);
        Placement {
            x: origin.x,
            y: origin.y,
            width: 0.0,
            height: 0.0,
            rotation_deg: self.rotation as f32 + extra_rotation_deg,
        }
    }

    pub fn font_size(&self, raster_size: f32) -> f32 {
        raster_size * self.scale_y
    }
}

/// Builds the output for the whole document.
///
/// A document that is still exactly one untouched PDF comes back as the
/// original bytes.
pub fn build_output(
    document: &Document,
    images: &ImageRegistry,
    metrics: &dyn FontMetrics,
    writer: &mut dyn DocumentWriter,
) -> Result<ExportOutcome, ExportError> {
    if document.is_empty() {
        return Err(ExportError::EmptyDocument);
    }
    if let Some(bytes) = passthrough_bytes(document) {
        tracing::info!(pages = document.page_count(), "document unchanged, returning source bytes");
        return Ok(ExportOutcome {
            bytes,
            page_count: document.page_count(),
            annotation_count: 0,
            passthrough: true,
        });
    }
    let positions: Vec<usize> = (0..document.page_count()).collect();
    Projector::new(document, images, metrics, writer).run(&positions)
}

/// Builds an output holding only the pages at `positions`, in that order.
pub fn build_selected(
    document: &Document,
    images: &ImageRegistry,
    metrics: &dyn FontMetrics,
    positions: &[usize],
    writer: &mut dyn DocumentWriter,
) -> Result<ExportOutcome, ExportError> {
    if positions.is_empty() {
        return Err(ExportError::EmptyDocument);
    }
    Projector::new(document, images, metrics, writer).run(positions)
}

fn passthrough_bytes(document: &Document) -> Option<Vec<u8>> {
    if document.annotations().total() > 0 {
        return None;
    }
    let first = document.pages().first()?;
    let source = document.source(first.source_id).ok()?;
    if source.is_image() || source.page_count() as usize != document.page_count() {
        return None;
    }
    let unchanged = document.pages().iter().enumerate().all(|(position, page)| {
        page.source_id == source.id
            && page.source_page_index as usize == position
            && page.rotation == 0
    });
    unchanged.then(|| source.bytes.as_ref().clone())
}

struct Projector<'a> {
    document: &'a Document,
    images: &'a ImageRegistry,
    metrics: &'a dyn FontMetrics,
    writer: &'a mut dyn DocumentWriter,
    fonts: HashMap<StandardFont, FontHandle>,
    embedded: HashMap<ImageId, ImageHandle>,
}

impl<'a> Projector<'a> {
    fn new(
        document: &'a Document,
        images: &'a ImageRegistry,
        metrics: &'a dyn FontMetrics,
        writer: &'a mut dyn DocumentWriter,
    ) -> Self {
        Self {
            document,
            images,
            metrics,
            writer,
            fonts: HashMap::new(),
            embedded: HashMap::new(),
        }
    }

    fn run(mut self, positions: &[usize]) -> Result<ExportOutcome, ExportError> {
        let mut annotation_count = 0;
        for &position in positions {
            annotation_count += self.emit_page(position)?;
        }
        let bytes = self.writer.save()?;
        tracing::info!(pages = positions.len(), annotations = annotation_count, "output built");
        Ok(ExportOutcome {
            bytes,
            page_count: positions.len(),
            annotation_count,
            passthrough: false,
        })
    }

    fn emit_page(&mut self, position: usize) -> Result<usize, ExportError> {
        let document = self.document;
        let page = document.page(position).map_err(|_| ExportError::UnknownPage(position))?;
        let source = document
            .source(page.source_id)
            .map_err(|_| ExportError::MissingSource(page.source_id))?;

        let output = if source.is_image() {
            let image = self.writer.embed_image(&source.bytes)?;
            self.writer.add_image_page(image, page.page_size.width_pt, page.page_size.height_pt)?
        } else {
            self.writer.copy_page(source.id, &source.bytes, page.source_page_index)?
        };
        self.writer.set_rotation(output, page.effective_rotation())?;

        let projection = PageProjection::for_page(page);
        let annotations = document.annotations().page(position);
        for annotation in annotations {
            self.emit_annotation(output, &projection, annotation)?;
        }
        tracing::debug!(page = position, annotations = annotations.len(), "page projected");
        Ok(annotations.len())
    }

    fn emit_annotation(
        &mut self,
        output: OutputPage,
        projection: &PageProjection,
        annotation: &Annotation,
    ) -> Result<(), ExportError> {
        match &annotation.kind {
            AnnotationKind::Whiteout(whiteout) => {
                let placement = projection.rect(whiteout.rect);
                self.writer.draw_rectangle(output, placement, Rgb::WHITE, 1.0)?;
            }
            AnnotationKind::Text(text) => {
                let family = FontFamily::parse(&text.font_family).unwrap_or_else(|| {
                    tracing::warn!(
                        family = %text.font_family,
                        "unknown font family, exporting with Helvetica"
                    );
                    FontFamily::Helvetica
                });
                let style = TextStyle {
                    font: self.font(family.standard_font(text.bold, text.italic))?,
                    size: projection.font_size(text.font_size),
                    color: text.color.to_rgb(),
                    opacity: text.color.alpha(),
                };
                let line_step = text.font_size * LINE_HEIGHT;
                for (index, line) in text.lines().enumerate() {
                    if line.is_empty() {
                        continue;
                    }
                    let baseline = Point::new(text.x, text.y + index as f32 * line_step);
                    self.writer.draw_text(output, projection.text(baseline, 0.0), line, style)?;
                }
            }
            AnnotationKind::Signature(signature) => {
                let image = self.image(signature.image)?;
                self.writer.draw_image(output, image, projection.rect(signature.rect), 1.0)?;
            }
            AnnotationKind::Watermark(watermark) => {
                let style = TextStyle {
                    font: self.font(watermark.family.standard_font(false, false))?,
                    size: projection.font_size(watermark.font_size),
                    color: watermark.color.to_rgb(),
                    opacity: watermark.opacity * watermark.color.alpha(),
                };
                let origin = watermark_origin(watermark, self.metrics);
                let placement = projection.text(origin, watermark.rotation_deg);
                self.writer.draw_text(output, placement, &watermark.text, style)?;
            }
            AnnotationKind::PageNumber(number) => {
                let style = TextStyle {
                    font: self.font(StandardFont::Helvetica)?,
                    size: projection.font_size(number.font_size),
                    color: number.color.to_rgb(),
                    opacity: number.color.alpha(),
                };
                let placement = projection.text(Point::new(number.x, number.y), 0.0);
                self.writer.draw_text(output, placement, &number.text, style)?;
            }
        }
        Ok(())
    }

    /// Embeds `font` once, falling back to Helvetica when the writer
    /// cannot provide it.
    fn font(&mut self, font: StandardFont) -> Result<FontHandle, ExportError> {
        if let Some(handle) = self.fonts.get(&font) {
            return Ok(*handle);
        }
        let handle = match self.writer.embed_font(FontRequest::Standard(font)) {
            Ok(handle) => handle,
            Err(err) if font != StandardFont::Helvetica => {
                tracing::warn!(
                    font = font.base_name(),
                    error = %err,
                    "font unavailable, using Helvetica"
                );
                self.font(StandardFont::Helvetica)?
            }
            Err(err) => return Err(ExportError::NoFont(format!("{}: {err}", font.base_name()))),
        };
        self.fonts.insert(font, handle);
        Ok(handle)
    }

    fn image(&mut self, id: ImageId) -> Result<ImageHandle, ExportError> {
        if let Some(handle) = self.embedded.get(&id) {
            return Ok(*handle);
        }
        let stored = self.images.get(id).ok_or(ExportError::MissingImage(id))?;
        let handle = self.writer.embed_image(&stored.encoded.bytes)?;
        self.embedded.insert(id, handle);
        Ok(handle)
    }
}

impl EditorSession {
    /// Builds the output document with the bundled writer.
    pub fn export(&mut self) -> EditorResult<ExportOutcome> {
        let mut writer = LopdfWriter::new();
        self.export_with(&mut writer)
    }

    pub fn export_with(&mut self, writer: &mut dyn DocumentWriter) -> EditorResult<ExportOutcome> {
        self.ensure_structure_idle()?;
        let result = build_output(&self.document, &self.images, &self.metrics, writer);
        self.report_export(result, "Document exported")
    }

    /// Builds a standalone output of the pages chosen in extract mode.
    /// The session itself is left as it is.
    pub fn extract_selected(&mut self) -> EditorResult<ExportOutcome> {
        self.ensure_structure_idle()?;
        let positions = self.extract_selection();
        if positions.is_empty() {
            self.notices.push(Notice::warning("Select at least one page to extract"));
            return Err(EditorError::InvalidOperation(
                "no pages selected for extraction".to_owned(),
            ));
        }
        let mut writer = LopdfWriter::new();
        let result =
            build_selected(&self.document, &self.images, &self.metrics, &positions, &mut writer);
        self.report_export(result, "Pages extracted")
    }

    fn report_export(
        &mut self,
        result: Result<ExportOutcome, ExportError>,
        success: &str,
    ) -> EditorResult<ExportOutcome> {
        match result {
            Ok(outcome) => {
                self.notices.push(Notice::success(format!(
                    "{success} ({} page(s))",
                    outcome.page_count
                )));
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                self.notices.push(Notice::error(format!("Export failed: {err}")));
                Err(err.into())
            }
        }
    }
}
