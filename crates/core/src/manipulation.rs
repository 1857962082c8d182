//! Annotation manipulation handles and resizing
//!
//! Selected annotations expose one square handle per bounding-box corner.
//! Dragging a handle resizes the annotation with the opposite corner held in
//! place; how the size responds depends on the annotation kind.

use crate::annotation::{measure_text_bounds, Annotation, AnnotationId, AnnotationKind};
use crate::config::EditorConfig;
use crate::fonts::FontMetrics;
use crate::geometry::{Corner, Point, Rect};

/// Corner handle with its position in surface space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationHandle {
    pub corner: Corner,
    pub position: Point,
    /// Side length of the drawn square.
    pub size: f32,
    pub annotation_id: AnnotationId,
}

impl ManipulationHandle {
    /// Square area centered on the handle position.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position.x - self.size / 2.0,
            self.position.y - self.size / 2.0,
            self.size,
            self.size,
        )
    }
}

/// Handles for a selected annotation; locked and passive annotations have none.
pub fn generate_handles(
    annotation: &Annotation,
    metrics: &dyn FontMetrics,
    handle_size: f32,
) -> Vec<ManipulationHandle> {
    if annotation.is_locked() || !annotation.is_interactive() {
        return Vec::new();
    }

    let bounds = annotation.bounds(metrics);
    Corner::ALL
        .iter()
        .map(|&corner| ManipulationHandle {
            corner,
            position: bounds.corner(corner),
            size: handle_size,
            annotation_id: annotation.id,
        })
        .collect()
}

/// The corner handle under `point`, if any.
///
/// A corner qualifies when the point is within `tolerance` of it on both
/// axes; with several candidates the nearest wins.
pub fn resize_handle_at(
    annotation: &Annotation,
    point: Point,
    metrics: &dyn FontMetrics,
    tolerance: f32,
) -> Option<Corner> {
    if annotation.is_locked() || !annotation.is_interactive() {
        return None;
    }

    let bounds = annotation.bounds(metrics);
    Corner::ALL
        .iter()
        .copied()
        .filter(|&corner| {
            let handle = bounds.corner(corner);
            (point.x - handle.x).abs() <= tolerance && (point.y - handle.y).abs() <= tolerance
        })
        .min_by(|&a, &b| {
            let da = point.distance_to(&bounds.corner(a));
            let db = point.distance_to(&bounds.corner(b));
            da.total_cmp(&db)
        })
}

/// Size limits applied while resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeLimits {
    pub min_whiteout_size: f32,
    pub min_signature_width: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
}

impl From<&EditorConfig> for ResizeLimits {
    fn from(config: &EditorConfig) -> Self {
        Self {
            min_whiteout_size: config.min_whiteout_size,
            min_signature_width: config.min_signature_width,
            min_font_size: config.min_font_size,
            max_font_size: config.max_font_size,
        }
    }
}

/// An in-progress corner drag
///
/// Every update recomputes from the annotation as it was when the drag
/// started, so the result only depends on the current pointer position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    pub corner: Corner,
    pub start: Point,
    pub original: Annotation,
    pub original_bounds: Rect,
}

impl ResizeState {
    pub fn new(
        annotation: &Annotation,
        corner: Corner,
        start: Point,
        metrics: &dyn FontMetrics,
    ) -> Self {
        Self {
            corner,
            start,
            original: annotation.clone(),
            original_bounds: annotation.bounds(metrics),
        }
    }

    pub fn resized(
        &self,
        current: Point,
        limits: &ResizeLimits,
        metrics: &dyn FontMetrics,
    ) -> Annotation {
        let dx = current.x - self.start.x;
        let dy = current.y - self.start.y;
        let b0 = self.original_bounds;
        let dragged_width =
            if self.corner.grows_rightward() { b0.width + dx } else { b0.width - dx };
        let dragged_height = match self.corner {
            Corner::BottomLeft | Corner::BottomRight => b0.height + dy,
            Corner::TopLeft | Corner::TopRight => b0.height - dy,
        };

        let mut next = self.original.clone();
        match &mut next.kind {
            AnnotationKind::Whiteout(whiteout) => {
                let width = dragged_width.max(limits.min_whiteout_size);
                let height = dragged_height.max(limits.min_whiteout_size);
                whiteout.rect = b0.anchored_resize(self.corner, width, height);
            }
            AnnotationKind::Signature(signature) => {
                let aspect = match &self.original.kind {
                    AnnotationKind::Signature(original) => original.aspect_ratio(),
                    _ => signature.aspect_ratio(),
                };
                let width = dragged_width.max(limits.min_signature_width);
                let height = width / aspect;
                signature.rect = b0.anchored_resize(self.corner, width, height);
            }
            AnnotationKind::Text(text) => {
                // Width drives a uniform scale of the font size.
                let scale = if b0.width > 0.0 { dragged_width / b0.width } else { 1.0 };
                text.font_size =
                    (text.font_size * scale).clamp(limits.min_font_size, limits.max_font_size);
                let measured = measure_text_bounds(text, metrics);
                let placed = b0.anchored_resize(self.corner, measured.width, measured.height);
                text.x = placed.x;
                text.y = placed.y + text.font_size;
            }
            AnnotationKind::Watermark(_) | AnnotationKind::PageNumber(_) => {}
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Color, SignatureAnnotation, SignatureRole, TextAnnotation};
    use crate::fonts::StandardFontMetrics;
    use crate::images::tests::dummy_image_id;

    fn limits() -> ResizeLimits {
        ResizeLimits::from(&EditorConfig::default())
    }

    fn signature(rect: Rect, locked: bool) -> Annotation {
        Annotation::signature(SignatureAnnotation {
            rect,
            image: dummy_image_id(),
            locked,
            role: SignatureRole::Signature,
        })
    }

    fn rect_of(annotation: &Annotation) -> Rect {
        annotation.bounds(&StandardFontMetrics)
    }

    #[test]
    fn handle_hit_picks_corner_within_tolerance() {
        let annotation = Annotation::whiteout(Rect::new(100.0, 100.0, 200.0, 100.0));
        let metrics = StandardFontMetrics;

        assert_eq!(
            resize_handle_at(&annotation, Point::new(295.0, 205.0), &metrics, 12.0),
            Some(Corner::BottomRight)
        );
        assert_eq!(
            resize_handle_at(&annotation, Point::new(90.0, 110.0), &metrics, 12.0),
            Some(Corner::TopLeft)
        );
        assert_eq!(resize_handle_at(&annotation, Point::new(200.0, 150.0), &metrics, 12.0), None);
    }

    #[test]
    fn locked_annotations_have_no_handles() {
        let locked = signature(Rect::new(0.0, 0.0, 100.0, 50.0), true);
        let metrics = StandardFontMetrics;

        assert_eq!(resize_handle_at(&locked, Point::new(100.0, 50.0), &metrics, 12.0), None);
        assert!(generate_handles(&locked, &metrics, 8.0).is_empty());
    }

    #[test]
    fn signature_resize_keeps_aspect_and_opposite_corner() {
        let original = signature(Rect::new(100.0, 100.0, 200.0, 100.0), false);
        let metrics = StandardFontMetrics;

        for corner in Corner::ALL {
            let start = rect_of(&original).corner(corner);
            let state = ResizeState::new(&original, corner, start, &metrics);
            let pull = if corner.grows_rightward() { 40.0 } else { -40.0 };
            let resized = state.resized(Point::new(start.x + pull, start.y), &limits(), &metrics);
            let rect = rect_of(&resized);

            assert_eq!(rect.width, 240.0, "{corner:?}");
            assert_eq!(rect.height, 120.0, "{corner:?}");
            assert_eq!(
                rect.corner(corner.opposite()),
                rect_of(&original).corner(corner.opposite()),
                "{corner:?}"
            );
        }
    }

    #[test]
    fn signature_width_is_clamped() {
        let original = signature(Rect::new(100.0, 100.0, 200.0, 100.0), false);
        let metrics = StandardFontMetrics;
        let state =
            ResizeState::new(&original, Corner::BottomRight, Point::new(300.0, 200.0), &metrics);

        let resized = state.resized(Point::new(0.0, 200.0), &limits(), &metrics);
        let rect = rect_of(&resized);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (100.0, 100.0, 50.0, 25.0));
    }

    #[test]
    fn whiteout_resizes_freely_above_minimum() {
        let original = Annotation::whiteout(Rect::new(10.0, 10.0, 50.0, 50.0));
        let metrics = StandardFontMetrics;
        let state = ResizeState::new(&original, Corner::TopLeft, Point::new(10.0, 10.0), &metrics);

        let grown = state.resized(Point::new(0.0, 5.0), &limits(), &metrics);
        assert_eq!(rect_of(&grown), Rect::new(0.0, 5.0, 60.0, 55.0));

        let collapsed = state.resized(Point::new(100.0, 100.0), &limits(), &metrics);
        assert_eq!(rect_of(&collapsed), Rect::new(55.0, 55.0, 5.0, 5.0));
    }

    #[test]
    fn text_resize_scales_font_and_clamps() {
        let original = Annotation::text(TextAnnotation {
            x: 50.0,
            y: 100.0,
            text: "Hello".to_owned(),
            font_size: 20.0,
            font_family: "Helvetica".to_owned(),
            bold: false,
            italic: false,
            color: Color::BLACK,
        });
        let metrics = StandardFontMetrics;
        let b0 = rect_of(&original);
        let start = b0.corner(Corner::BottomRight);
        let state = ResizeState::new(&original, Corner::BottomRight, start, &metrics);

        let doubled = state.resized(
            Point::new(b0.right() + b0.width, b0.bottom()),
            &limits(),
            &metrics,
        );
        let AnnotationKind::Text(text) = &doubled.kind else {
            panic!("kind should not change");
        };
        assert!((text.font_size - 40.0).abs() < 1e-3);
        // Top-left stays put, so the baseline moves down with the font size.
        assert!((text.x - 50.0).abs() < 1e-3);
        assert!((text.y - (b0.y + 40.0)).abs() < 1e-3);

        let tiny = state.resized(Point::new(b0.x + 1.0, b0.bottom()), &limits(), &metrics);
        let AnnotationKind::Text(text) = &tiny.kind else {
            panic!("kind should not change");
        };
        assert_eq!(text.font_size, 6.0);
    }

    #[test]
    fn text_resize_clamps_at_both_limits_from_every_corner() {
        let original = Annotation::text(TextAnnotation {
            x: 300.0,
            y: 300.0,
            text: "Signed by\nthe applicant".to_owned(),
            font_size: 20.0,
            font_family: "Times".to_owned(),
            bold: true,
            italic: false,
            color: Color::BLACK,
        });
        let metrics = StandardFontMetrics;
        let b0 = rect_of(&original);

        for corner in Corner::ALL {
            let start = b0.corner(corner);
            let outward = if corner.grows_rightward() { 5000.0 } else { -5000.0 };
            let state = ResizeState::new(&original, corner, start, &metrics);

            for (pull, expected) in [(outward, 120.0), (-outward, 6.0)] {
                let resized =
                    state.resized(Point::new(start.x + pull, start.y), &limits(), &metrics);
                let AnnotationKind::Text(text) = &resized.kind else {
                    panic!("kind should not change");
                };
                assert_eq!(text.font_size, expected, "{corner:?}");

                let fixed = b0.corner(corner.opposite());
                let moved = rect_of(&resized).corner(corner.opposite());
                assert!(
                    fixed.distance_to(&moved) < 0.5,
                    "{corner:?} at {expected}: {fixed:?} vs {moved:?}"
                );
            }
        }
    }
}
