//! Annotation renderer
//!
//! Paints a page's annotations over its pristine render. A redraw always
//! starts from the pristine raster, so repeated redraws never accumulate.

use crate::annotation::{Annotation, AnnotationKind, Color, Watermark, LINE_HEIGHT};
use crate::config::EditorConfig;
use crate::fonts::{FontMetrics, FontSpec};
use crate::geometry::{Point, Rect};
use crate::images::{ImageId, ImageRegistry};
use crate::manipulation::generate_handles;
use crate::surface::{Surface, TextRun};
use pdf_engine::RgbaImage;

/// Baseline offset that vertically centers a line of watermark text.
const WATERMARK_BASELINE_SHIFT: f32 = 0.35;

pub struct RenderContext<'a> {
    pub metrics: &'a dyn FontMetrics,
    pub images: &'a ImageRegistry,
    pub config: &'a EditorConfig,
}

/// Transient previews drawn above the annotations.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    WhiteoutDraft(Rect),
    SignatureGhost { rect: Rect, image: ImageId },
}

/// Baseline start of a watermark such that its text is centered on
/// `watermark.center` after rotation.
pub fn watermark_origin(watermark: &Watermark, metrics: &dyn FontMetrics) -> Point {
    let spec = FontSpec {
        family: watermark.family,
        size: watermark.font_size,
        bold: false,
        italic: false,
    };
    let width = metrics.line_width(&watermark.text, &spec);
    let dx = -width / 2.0;
    let dy = watermark.font_size * WATERMARK_BASELINE_SHIFT;
    let (sin, cos) = (-watermark.rotation_deg).to_radians().sin_cos();
    Point::new(
        watermark.center.x + dx * cos - dy * sin,
        watermark.center.y + dx * sin + dy * cos,
    )
}

pub fn render_annotation(
    surface: &mut dyn Surface,
    annotation: &Annotation,
    selected: bool,
    ctx: &RenderContext<'_>,
) {
    match &annotation.kind {
        AnnotationKind::Whiteout(whiteout) => surface.fill_rect(whiteout.rect, Color::WHITE),
        AnnotationKind::Text(text) => {
            let spec = text.font_spec();
            for (line_index, line) in text.lines().enumerate() {
                surface.fill_text(&TextRun {
                    text: line,
                    origin: Point::new(
                        text.x,
                        text.y + line_index as f32 * text.font_size * LINE_HEIGHT,
                    ),
                    spec,
                    color: text.color,
                    opacity: 1.0,
                    rotation_deg: 0.0,
                });
            }
        }
        AnnotationKind::Signature(signature) => match ctx.images.get(signature.image) {
            Some(image) => surface.draw_image(&image.raster, signature.rect, 1.0),
            None => {
                tracing::warn!(image = %signature.image, "signature image missing");
                surface.stroke_rect(signature.rect, Color::GRAY, 1.0, true);
            }
        },
        AnnotationKind::Watermark(watermark) => {
            surface.fill_text(&TextRun {
                text: &watermark.text,
                origin: watermark_origin(watermark, ctx.metrics),
                spec: FontSpec {
                    family: watermark.family,
                    size: watermark.font_size,
                    bold: false,
                    italic: false,
                },
                color: watermark.color,
                opacity: watermark.opacity,
                rotation_deg: watermark.rotation_deg,
            });
        }
        AnnotationKind::PageNumber(number) => {
            surface.fill_text(&TextRun {
                text: &number.text,
                origin: Point::new(number.x, number.y),
                spec: number.font_spec(),
                color: number.color,
                opacity: 1.0,
                rotation_deg: 0.0,
            });
        }
    }

    if selected {
        draw_selection(surface, annotation, ctx);
    }
}

/// Locked annotations get a solid outline and no handles; everything else
/// interactive gets a dashed outline plus four corner handles.
pub fn draw_selection(
    surface: &mut dyn Surface,
    annotation: &Annotation,
    ctx: &RenderContext<'_>,
) {
    if !annotation.is_interactive() {
        return;
    }
    let bounds = annotation.bounds(ctx.metrics);

    if annotation.is_locked() {
        surface.stroke_rect(bounds, ctx.config.locked_outline, 2.0, false);
        return;
    }

    surface.stroke_rect(bounds, ctx.config.selection_color, 1.0, true);
    for handle in generate_handles(annotation, ctx.metrics, ctx.config.handle_size) {
        let square = handle.rect();
        surface.fill_rect(square, Color::WHITE);
        surface.stroke_rect(square, ctx.config.selection_color, 1.0, false);
    }
}

pub fn draw_overlay(surface: &mut dyn Surface, overlay: &Overlay, ctx: &RenderContext<'_>) {
    match overlay {
        Overlay::WhiteoutDraft(rect) => {
            surface.fill_rect(*rect, Color::WHITE);
            surface.stroke_rect(*rect, ctx.config.selection_color, 1.0, true);
        }
        Overlay::SignatureGhost { rect, image } => {
            if let Some(stored) = ctx.images.get(*image) {
                surface.draw_image(&stored.raster, *rect, 0.5);
            }
            surface.stroke_rect(*rect, ctx.config.selection_color, 1.0, true);
        }
    }
}

/// Restores the pristine render and paints every annotation of the page.
pub fn redraw_page(
    surface: &mut dyn Surface,
    pristine: &RgbaImage,
    annotations: &[Annotation],
    selected: Option<usize>,
    overlay: Option<&Overlay>,
    ctx: &RenderContext<'_>,
) {
    surface.restore(pristine);
    for (index, annotation) in annotations.iter().enumerate() {
        render_annotation(surface, annotation, selected == Some(index), ctx);
    }
    if let Some(overlay) = overlay {
        draw_overlay(surface, overlay, ctx);
    }
}

/// Index of the topmost interactive annotation containing `point`.
pub fn hit_test(
    annotations: &[Annotation],
    point: Point,
    metrics: &dyn FontMetrics,
) -> Option<usize> {
    annotations.iter().enumerate().rev().find_map(|(index, annotation)| {
        (annotation.is_interactive() && annotation.bounds(metrics).contains(point)).then_some(index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{SignatureAnnotation, SignatureRole, TextAnnotation};
    use crate::fonts::{FontFamily, StandardFontMetrics};
    use crate::surface::tests::RecordingSurface;
    use crate::surface::RasterSurface;
    use image::Rgba;

    fn text(x: f32, y: f32, body: &str) -> Annotation {
        Annotation::text(TextAnnotation {
            x,
            y,
            text: body.to_owned(),
            font_size: 10.0,
            font_family: "Helvetica".to_owned(),
            bold: false,
            italic: false,
            color: Color::BLACK,
        })
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let annotations = vec![
            Annotation::whiteout(Rect::new(0.0, 0.0, 100.0, 100.0)),
            Annotation::whiteout(Rect::new(50.0, 50.0, 100.0, 100.0)),
        ];
        let metrics = StandardFontMetrics;

        assert_eq!(hit_test(&annotations, Point::new(60.0, 60.0), &metrics), Some(1));
        assert_eq!(hit_test(&annotations, Point::new(10.0, 10.0), &metrics), Some(0));
        assert_eq!(hit_test(&annotations, Point::new(500.0, 500.0), &metrics), None);
    }

    #[test]
    fn multi_line_text_draws_one_run_per_line() {
        let config = EditorConfig::default();
        let images = ImageRegistry::new();
        let ctx = RenderContext { metrics: &StandardFontMetrics, images: &images, config: &config };
        let mut surface = RecordingSurface::new(200, 200);

        render_annotation(&mut surface, &text(10.0, 20.0, "one\ntwo"), false, &ctx);

        assert_eq!(surface.calls, vec!["text \"one\" 10 20", "text \"two\" 10 32"]);
    }

    #[test]
    fn locked_selection_has_outline_without_handles() {
        let config = EditorConfig::default();
        let images = ImageRegistry::new();
        let ctx = RenderContext { metrics: &StandardFontMetrics, images: &images, config: &config };
        let mut surface = RecordingSurface::new(200, 200);
        let locked = Annotation::signature(SignatureAnnotation {
            rect: Rect::new(10.0, 10.0, 50.0, 25.0),
            image: crate::images::tests::dummy_image_id(),
            locked: true,
            role: SignatureRole::Signature,
        });

        draw_selection(&mut surface, &locked, &ctx);
        assert_eq!(surface.calls, vec!["stroke solid 10 10 50 25 #16a34a"]);

        surface.calls.clear();
        draw_selection(&mut surface, &Annotation::whiteout(Rect::new(0.0, 0.0, 20.0, 20.0)), &ctx);
        let fills = surface.calls.iter().filter(|call| call.starts_with("fill")).count();
        assert_eq!(fills, 4);
    }

    #[test]
    fn redraw_is_idempotent() {
        let config = EditorConfig::default();
        let images = ImageRegistry::new();
        let ctx = RenderContext { metrics: &StandardFontMetrics, images: &images, config: &config };
        let pristine = RgbaImage::from_pixel(120, 80, Rgba([240, 240, 240, 255]));
        let annotations = vec![
            Annotation::whiteout(Rect::new(5.0, 5.0, 30.0, 20.0)),
            text(40.0, 50.0, "Hi"),
        ];
        let mut surface = RasterSurface::from_image(pristine.clone());

        redraw_page(&mut surface, &pristine, &annotations, Some(0), None, &ctx);
        let first = surface.image().clone();
        redraw_page(&mut surface, &pristine, &annotations, Some(0), None, &ctx);

        assert_eq!(surface.image(), &first);
        assert_eq!(first.get_pixel(15, 15).0, [255, 255, 255, 255]);
    }

    #[test]
    fn watermark_origin_centers_unrotated_text() {
        let watermark = Watermark {
            center: Point::new(100.0, 100.0),
            text: "DRAFT".to_owned(),
            font_size: 20.0,
            family: FontFamily::Helvetica,
            color: Color::GRAY,
            opacity: 0.3,
            rotation_deg: 0.0,
        };
        let width = StandardFontMetrics.line_width(
            "DRAFT",
            &FontSpec { family: FontFamily::Helvetica, size: 20.0, bold: false, italic: false },
        );

        let origin = watermark_origin(&watermark, &StandardFontMetrics);
        assert!((origin.x - (100.0 - width / 2.0)).abs() < 1e-3);
        assert!((origin.y - 107.0).abs() < 1e-3);
    }
}
