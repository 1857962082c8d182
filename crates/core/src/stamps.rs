//! Document-wide stamps
//!
//! Watermarks, page numbers and paraf copies are added to every page at
//! once and recorded as a single annotation edit. Sizes given in document
//! units are converted per page, so pages rendered at different raster
//! sizes get visually identical stamps.

use crate::annotation::{
    Annotation, AnnotationKind, Color, PageNumber, SignatureAnnotation, SignatureRole, Watermark,
};
use crate::error::{EditorError, EditorResult};
use crate::fonts::{FontFamily, FontMetrics, FontSpec};
use crate::geometry::{Point, Rect};
use crate::images::ImageId;
use crate::notice::Notice;
use crate::session::EditorSession;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkOptions {
    pub text: String,
    /// In document units.
    pub font_size: f32,
    pub family: FontFamily,
    pub color: Color,
    pub opacity: f32,
    /// Counter-clockwise.
    pub rotation_deg: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: "CONFIDENTIAL".to_owned(),
            font_size: 48.0,
            family: FontFamily::Helvetica,
            color: Color::GRAY,
            opacity: 0.3,
            rotation_deg: 45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageNumberPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

impl PageNumberPosition {
    fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopCenter | Self::TopRight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageNumberOptions {
    /// `{n}` becomes the page number, `{total}` the page count.
    pub template: String,
    pub position: PageNumberPosition,
    /// Distance from the page edges, in document units.
    pub margin: f32,
    pub font_size: f32,
    pub color: Color,
    pub start_at: usize,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        Self {
            template: "{n} / {total}".to_owned(),
            position: PageNumberPosition::default(),
            margin: 24.0,
            font_size: 12.0,
            color: Color::BLACK,
            start_at: 1,
        }
    }
}

pub fn format_page_label(template: &str, number: usize, total: usize) -> String {
    template.replace("{n}", &number.to_string()).replace("{total}", &total.to_string())
}

/// Baseline start of a page number label on a `width x height` raster.
fn page_number_origin(
    options: &PageNumberOptions,
    label_width: f32,
    font_size: f32,
    margin: f32,
    (width, height): (f32, f32),
) -> Point {
    let x = match options.position {
        PageNumberPosition::TopLeft | PageNumberPosition::BottomLeft => margin,
        PageNumberPosition::TopCenter | PageNumberPosition::BottomCenter => {
            (width - label_width) / 2.0
        }
        PageNumberPosition::TopRight | PageNumberPosition::BottomRight => {
            width - margin - label_width
        }
    };
    let y = if options.position.is_top() { margin + font_size } else { height - margin };
    Point::new(x, y)
}

impl EditorSession {
    /// Adds one centered watermark to every page.
    pub fn watermark_all_pages(&mut self, options: &WatermarkOptions) -> EditorResult<usize> {
        if options.text.trim().is_empty() {
            return Err(EditorError::InvalidOperation("watermark text is empty".to_owned()));
        }
        let stamps = self.per_page(|_, _, (width, height), scale| {
            AnnotationKind::Watermark(Watermark {
                center: Point::new(width / 2.0, height / 2.0),
                text: options.text.clone(),
                font_size: options.font_size * scale,
                family: options.family,
                color: options.color,
                opacity: options.opacity.clamp(0.0, 1.0),
                rotation_deg: options.rotation_deg,
            })
        })?;
        let count = self.apply_stamps(stamps);
        self.notices.push(Notice::success(format!("Watermark added to {count} page(s)")));
        tracing::info!(pages = count, "watermark applied");
        Ok(count)
    }

    /// Adds a page number label to every page.
    pub fn add_page_numbers(&mut self, options: &PageNumberOptions) -> EditorResult<usize> {
        let total = self.page_count();
        let stamps = self.per_page(|session, index, frame, scale| {
            let text = format_page_label(&options.template, options.start_at + index, total);
            let font_size = options.font_size * scale;
            let spec = FontSpec {
                family: FontFamily::Helvetica,
                size: font_size,
                bold: false,
                italic: false,
            };
            let label_width = session.metrics.line_width(&text, &spec);
            let origin =
                page_number_origin(options, label_width, font_size, options.margin * scale, frame);
            AnnotationKind::PageNumber(PageNumber {
                x: origin.x,
                y: origin.y,
                text,
                font_size,
                color: options.color,
            })
        })?;
        let count = self.apply_stamps(stamps);
        self.notices.push(Notice::success(format!("Page numbers added to {count} page(s)")));
        tracing::info!(pages = count, "page numbers applied");
        Ok(count)
    }

    /// Places locked paraf copies on every page at the same relative
    /// position as `rect` on `source_page`.
    pub(crate) fn propagate_paraf(
        &mut self,
        source_page: usize,
        rect: Rect,
        image: ImageId,
    ) -> EditorResult<usize> {
        let (source_width, source_height) = self.document.page(source_page)?.raster_size();
        let (source_width, source_height) = (source_width as f32, source_height as f32);
        let aspect = if rect.height > 0.0 { rect.width / rect.height } else { 1.0 };
        let relative = Rect::new(
            rect.x / source_width,
            rect.y / source_height,
            rect.width / source_width,
            0.0,
        );

        let stamps = self.per_page(|_, _, (width, height), _| {
            let copy_width = relative.width * width;
            AnnotationKind::Signature(SignatureAnnotation {
                rect: Rect::new(
                    relative.x * width,
                    relative.y * height,
                    copy_width,
                    copy_width / aspect,
                ),
                image,
                locked: true,
                role: SignatureRole::Paraf,
            })
        })?;
        let count = self.apply_stamps(stamps);
        tracing::info!(pages = count, source_page, "paraf propagated");
        Ok(count)
    }

    /// Builds one annotation per page from its raster size and its raster
    /// pixels per document unit.
    fn per_page<F>(&self, mut build: F) -> EditorResult<Vec<AnnotationKind>>
    where
        F: FnMut(&EditorSession, usize, (f32, f32), f32) -> AnnotationKind,
    {
        if self.document.is_empty() {
            return Err(EditorError::EmptyDocument);
        }
        (0..self.page_count())
            .map(|index| {
                let (width, height) = self.document.page(index)?.raster_size();
                let scale = self.page_scale(index)?;
                Ok(build(self, index, (width as f32, height as f32), scale))
            })
            .collect()
    }

    fn apply_stamps(&mut self, stamps: Vec<AnnotationKind>) -> usize {
        self.push_annotation_snapshot();
        let count = stamps.len();
        for (index, kind) in stamps.into_iter().enumerate() {
            self.document.annotations_mut().push(index, Annotation::new(kind));
        }
        self.clear_selection();
        count
    }
}
