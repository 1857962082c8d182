//! Drawing surfaces
//!
//! `Surface` is the 2D drawing contract the annotation renderer paints
//! through. `RasterSurface` draws into an RGBA buffer; text uses an
//! `ab_glyph` font when one is loaded and falls back to solid glyph boxes
//! otherwise. Glyph advances always come from [`FontMetrics`] so on-screen
//! layout matches the exported document.

use crate::annotation::Color;
use crate::fonts::{FontMetrics, FontSpec, StandardFontMetrics};
use crate::geometry::{Point, Rect};
use ab_glyph::{point, Font, FontArc, PxScale};
use image::Rgba;
use pdf_engine::RgbaImage;

/// One line of text to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    /// Start of the baseline.
    pub origin: Point,
    pub spec: FontSpec,
    pub color: Color,
    pub opacity: f32,
    /// Counter-clockwise, about `origin`.
    pub rotation_deg: f32,
}

pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Replaces every pixel with the pristine page render.
    fn restore(&mut self, pristine: &RgbaImage);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32, dashed: bool);

    fn fill_text(&mut self, run: &TextRun<'_>);

    fn draw_image(&mut self, image: &RgbaImage, rect: Rect, opacity: f32);
}

const DASH: u32 = 4;

pub struct RasterSurface {
    image: RgbaImage,
    font: Option<FontArc>,
    metrics: StandardFontMetrics,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("size", &self.image.dimensions())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image, font: None, metrics: StandardFontMetrics }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Parses a TrueType/OpenType font for glyph rendering.
    pub fn load_font(bytes: Vec<u8>) -> Option<FontArc> {
        FontArc::try_from_vec(bytes).ok()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn blend(&mut self, x: i64, y: i64, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let alpha = (color.alpha() * coverage).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let mix = |dst: u8, src: u8| -> u8 {
            (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round() as u8
        };
        let out_alpha = (alpha + pixel.0[3] as f32 / 255.0 * (1.0 - alpha)).min(1.0);
        *pixel = Rgba([
            mix(pixel.0[0], color.r),
            mix(pixel.0[1], color.g),
            mix(pixel.0[2], color.b),
            (out_alpha * 255.0).round() as u8,
        ]);
    }

    /// Pixel span `[start, end)` covered by `[from, to)`, clipped to `limit`.
    fn span(from: f32, to: f32, limit: u32) -> (i64, i64) {
        let start = from.round().max(0.0) as i64;
        let end = (to.round() as i64).min(limit as i64);
        (start, end)
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn restore(&mut self, pristine: &RgbaImage) {
        if pristine.dimensions() == self.image.dimensions() {
            self.image.copy_from_slice(pristine.as_raw());
        } else {
            self.image = pristine.clone();
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (x0, x1) = Self::span(rect.x, rect.right(), self.image.width());
        let (y0, y1) = Self::span(rect.y, rect.bottom(), self.image.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color, 1.0);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32, dashed: bool) {
        let thickness = line_width.round().max(1.0) as i64;
        let left = rect.x.round() as i64;
        let top = rect.y.round() as i64;
        let right = rect.right().round() as i64;
        let bottom = rect.bottom().round() as i64;
        let visible = |step: i64| !dashed || (step / DASH as i64) % 2 == 0;

        for x in left..=right {
            if !visible(x - left) {
                continue;
            }
            for t in 0..thickness {
                self.blend(x, top + t, color, 1.0);
                self.blend(x, bottom - t, color, 1.0);
            }
        }
        for y in top..=bottom {
            if !visible(y - top) {
                continue;
            }
            for t in 0..thickness {
                self.blend(left + t, y, color, 1.0);
                self.blend(right - t, y, color, 1.0);
            }
        }
    }

    fn fill_text(&mut self, run: &TextRun<'_>) {
        let alpha = (run.color.a as f32 * run.opacity.clamp(0.0, 1.0)).round() as u8;
        let color = Color { a: alpha, ..run.color };
        let (sin, cos) = (-run.rotation_deg).to_radians().sin_cos();
        let origin = run.origin;
        let place = move |x: f32, y: f32| -> (i64, i64) {
            let (dx, dy) = (x - origin.x, y - origin.y);
            (
                (origin.x + dx * cos - dy * sin).round() as i64,
                (origin.y + dx * sin + dy * cos).round() as i64,
            )
        };

        let mut pen_x = origin.x;
        let size = run.spec.size;
        for ch in run.text.chars() {
            let advance =
                self.metrics.advance(run.spec.family, run.spec.bold, ch) as f32 * size / 1000.0;

            let mut covered: Vec<(i64, i64, f32)> = Vec::new();
            match &self.font {
                Some(font) => {
                    let glyph = font
                        .glyph_id(ch)
                        .with_scale_and_position(PxScale::from(size), point(pen_x, origin.y));
                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, coverage| {
                            let (x, y) =
                                place(bounds.min.x + gx as f32, bounds.min.y + gy as f32);
                            covered.push((x, y, coverage));
                        });
                    }
                }
                None if !ch.is_whitespace() => {
                    // Solid box standing on the baseline.
                    let box_width = (advance * 0.8).max(1.0);
                    let box_height = size * 0.7;
                    let mut y = origin.y - box_height;
                    while y < origin.y {
                        let mut x = pen_x + advance * 0.1;
                        while x < pen_x + advance * 0.1 + box_width {
                            let (px, py) = place(x, y);
                            covered.push((px, py, 1.0));
                            x += 1.0;
                        }
                        y += 1.0;
                    }
                }
                None => {}
            }

            for (x, y, coverage) in covered {
                self.blend(x, y, color, coverage);
            }
            pen_x += advance;
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, rect: Rect, opacity: f32) {
        let width = rect.width.round().max(1.0) as u32;
        let height = rect.height.round().max(1.0) as u32;
        let scaled = if image.dimensions() == (width, height) {
            image.clone()
        } else {
            image::imageops::resize(image, width, height, image::imageops::FilterType::Triangle)
        };
        let left = rect.x.round() as i64;
        let top = rect.y.round() as i64;

        for (x, y, pixel) in scaled.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            self.blend(
                left + x as i64,
                top + y as i64,
                Color::rgb(r, g, b),
                a as f32 / 255.0 * opacity.clamp(0.0, 1.0),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records draw calls instead of painting.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub width: u32,
        pub height: u32,
        pub calls: Vec<String>,
    }

    impl RecordingSurface {
        pub(crate) fn new(width: u32, height: u32) -> Self {
            Self { width, height, calls: Vec::new() }
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn restore(&mut self, _pristine: &RgbaImage) {
            self.calls.push("restore".to_owned());
        }

        fn fill_rect(&mut self, rect: Rect, color: Color) {
            self.calls
                .push(format!("fill {} {} {} {} {color}", rect.x, rect.y, rect.width, rect.height));
        }

        fn stroke_rect(&mut self, rect: Rect, color: Color, _line_width: f32, dashed: bool) {
            let style = if dashed { "dashed" } else { "solid" };
            self.calls.push(format!(
                "stroke {style} {} {} {} {} {color}",
                rect.x, rect.y, rect.width, rect.height
            ));
        }

        fn fill_text(&mut self, run: &TextRun<'_>) {
            self.calls.push(format!("text {:?} {} {}", run.text, run.origin.x, run.origin.y));
        }

        fn draw_image(&mut self, _image: &RgbaImage, rect: Rect, _opacity: f32) {
            self.calls.push(format!("image {} {} {} {}", rect.x, rect.y, rect.width, rect.height));
        }
    }

    pub(crate) fn glyph_font_bytes() -> Vec<u8> {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/DejaVuSansMono.ttf"))
            .to_vec()
    }

    /// Center of the bounding box of every dark pixel.
    pub(crate) fn ink_center(image: &RgbaImage) -> (u32, u32) {
        let dark: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, pixel)| pixel.0[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!dark.is_empty(), "expected some ink");
        let min_x = dark.iter().map(|(x, _)| *x).min().unwrap_or_default();
        let max_x = dark.iter().map(|(x, _)| *x).max().unwrap_or_default();
        let min_y = dark.iter().map(|(_, y)| *y).min().unwrap_or_default();
        let max_y = dark.iter().map(|(_, y)| *y).max().unwrap_or_default();
        ((min_x + max_x) / 2, (min_y + max_y) / 2)
    }

    fn letter_o() -> TextRun<'static> {
        TextRun {
            text: "o",
            origin: Point::new(20.0, 80.0),
            spec: FontSpec {
                family: crate::fonts::FontFamily::Courier,
                size: 60.0,
                bold: false,
                italic: false,
            },
            color: Color::BLACK,
            opacity: 1.0,
            rotation_deg: 0.0,
        }
    }

    #[test]
    fn fill_rect_paints_clipped_area() {
        let mut surface = RasterSurface::new(10, 10);
        surface.fill_rect(Rect::new(-5.0, 2.0, 8.0, 3.0), Color::BLACK);

        assert_eq!(surface.image().get_pixel(0, 2).0, [0, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(2, 4).0, [0, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(3, 2).0, [255, 255, 255, 255]);
        assert_eq!(surface.image().get_pixel(0, 5).0, [255, 255, 255, 255]);
    }

    #[test]
    fn restore_discards_overlays() {
        let pristine = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let mut surface = RasterSurface::from_image(pristine.clone());
        surface.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::RED);

        surface.restore(&pristine);
        assert_eq!(surface.image(), &pristine);
    }

    #[test]
    fn fallback_text_marks_pixels_above_baseline() {
        let mut surface = RasterSurface::new(100, 40);
        surface.fill_text(&TextRun {
            text: "M",
            origin: Point::new(10.0, 30.0),
            spec: FontSpec {
                family: crate::fonts::FontFamily::Helvetica,
                size: 20.0,
                bold: false,
                italic: false,
            },
            color: Color::BLACK,
            opacity: 1.0,
            rotation_deg: 0.0,
        });

        assert_eq!(surface.image().get_pixel(15, 25).0, [0, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(15, 35).0, [255, 255, 255, 255]);
    }

    #[test]
    fn loaded_font_draws_glyph_outlines() {
        let font = RasterSurface::load_font(glyph_font_bytes()).expect("fixture font should parse");
        let mut outlined = RasterSurface::new(120, 120).with_font(font);
        outlined.fill_text(&letter_o());
        let mut boxed = RasterSurface::new(120, 120);
        boxed.fill_text(&letter_o());

        // The counter of an "o" stays empty; a fallback box is solid.
        let (x, y) = ink_center(outlined.image());
        assert_eq!(outlined.image().get_pixel(x, y).0, [255, 255, 255, 255]);
        let (x, y) = ink_center(boxed.image());
        assert_eq!(boxed.image().get_pixel(x, y).0, [0, 0, 0, 255]);
    }

    #[test]
    fn unparseable_font_is_not_loaded() {
        assert!(RasterSurface::load_font(b"not a font".to_vec()).is_none());
    }

    #[test]
    fn translucent_image_blends() {
        let mut surface = RasterSurface::new(4, 4);
        let stamp = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        surface.draw_image(&stamp, Rect::new(1.0, 1.0, 2.0, 2.0), 0.5);

        let pixel = surface.image().get_pixel(1, 1).0;
        assert!((127..=128).contains(&pixel[0]), "got {pixel:?}");
        assert_eq!(surface.image().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
