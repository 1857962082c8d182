//! Annotation data model
//!
//! Annotations are stored per page in surface pixel coordinates. The page
//! key of an annotation list is the page's current position in the document,
//! so every structural page edit must reindex the map in the same step.

use crate::fonts::{FontFamily, FontMetrics, FontSpec};
use crate::geometry::{Point, Rect};
use crate::images::ImageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an annotation
///
/// Survives moves between positions and snapshot restores; generated with
/// UUID v4.
pub type AnnotationId = uuid::Uuid;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// RGBA color representation
///
/// Serialized as a `#rrggbb` (or `#rrggbbaa`) hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GRAY: Color = Color { r: 128, g: 128, b: 128, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(value: &str) -> Option<Color> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();

        match hex.len() {
            3 => {
                let expand = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Color::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Normalized RGB for the document writer; alpha travels separately.
    pub fn to_rgb(self) -> pdf_engine::Rgb {
        pdf_engine::Rgb {
            r: self.r as f32 / 255.0,
            g: self.g as f32 / 255.0,
            b: self.b as f32 / 255.0,
        }
    }

    pub fn alpha(self) -> f32 {
        self.a as f32 / 255.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value).ok_or_else(|| format!("invalid color {value:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Whiteout {
    pub rect: Rect,
}

/// Free text; `(x, y)` is the start of the first line's baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
}

impl TextAnnotation {
    pub fn family(&self) -> FontFamily {
        FontFamily::resolve(&self.font_family)
    }

    pub fn font_spec(&self) -> FontSpec {
        FontSpec {
            family: self.family(),
            size: self.font_size,
            bold: self.bold,
            italic: self.italic,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureRole {
    #[default]
    Signature,
    /// Initials, typically repeated on every page.
    Paraf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureAnnotation {
    pub rect: Rect,
    pub image: ImageId,
    pub locked: bool,
    #[serde(default)]
    pub role: SignatureRole,
}

impl SignatureAnnotation {
    pub fn aspect_ratio(&self) -> f32 {
        if self.rect.height > 0.0 {
            self.rect.width / self.rect.height
        } else {
            1.0
        }
    }
}

/// Rotated text centered on `center`; rotation is counter-clockwise degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    pub center: Point,
    pub text: String,
    pub font_size: f32,
    pub family: FontFamily,
    pub color: Color,
    pub opacity: f32,
    pub rotation_deg: f32,
}

/// Rendered page label; `(x, y)` is the baseline start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNumber {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub color: Color,
}

impl PageNumber {
    pub fn font_spec(&self) -> FontSpec {
        FontSpec { family: FontFamily::Helvetica, size: self.font_size, bold: false, italic: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnnotationKind {
    Whiteout(Whiteout),
    Text(TextAnnotation),
    Signature(SignatureAnnotation),
    Watermark(Watermark),
    PageNumber(PageNumber),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl Annotation {
    pub fn new(kind: AnnotationKind) -> Self {
        Self { id: uuid::Uuid::new_v4(), kind }
    }

    pub fn whiteout(rect: Rect) -> Self {
        Self::new(AnnotationKind::Whiteout(Whiteout { rect }))
    }

    pub fn text(text: TextAnnotation) -> Self {
        Self::new(AnnotationKind::Text(text))
    }

    pub fn signature(signature: SignatureAnnotation) -> Self {
        Self::new(AnnotationKind::Signature(signature))
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            AnnotationKind::Whiteout(_) => "whiteout",
            AnnotationKind::Text(_) => "text",
            AnnotationKind::Signature(SignatureAnnotation { role: SignatureRole::Paraf, .. }) => {
                "paraf"
            }
            AnnotationKind::Signature(_) => "signature",
            AnnotationKind::Watermark(_) => "watermark",
            AnnotationKind::PageNumber(_) => "pageNumber",
        }
    }

    /// Only signatures carry a lock.
    pub fn is_locked(&self) -> bool {
        matches!(&self.kind, AnnotationKind::Signature(signature) if signature.locked)
    }

    /// Whether pointer interaction (select, drag, resize) applies.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self.kind,
            AnnotationKind::Whiteout(_) | AnnotationKind::Text(_) | AnnotationKind::Signature(_)
        )
    }

    pub fn bounds(&self, metrics: &dyn FontMetrics) -> Rect {
        match &self.kind {
            AnnotationKind::Whiteout(whiteout) => whiteout.rect,
            AnnotationKind::Text(text) => measure_text_bounds(text, metrics),
            AnnotationKind::Signature(signature) => signature.rect,
            AnnotationKind::Watermark(watermark) => {
                let spec = FontSpec {
                    family: watermark.family,
                    size: watermark.font_size,
                    bold: false,
                    italic: false,
                };
                let width = metrics.line_width(&watermark.text, &spec);
                let height = watermark.font_size * LINE_HEIGHT;
                Rect::new(
                    watermark.center.x - width / 2.0,
                    watermark.center.y - height / 2.0,
                    width,
                    height,
                )
            }
            AnnotationKind::PageNumber(number) => {
                let width = metrics.line_width(&number.text, &number.font_spec());
                Rect::new(
                    number.x,
                    number.y - number.font_size,
                    width,
                    number.font_size * LINE_HEIGHT,
                )
            }
        }
    }

    /// The stored position that a drag moves.
    pub fn anchor(&self) -> Point {
        match &self.kind {
            AnnotationKind::Whiteout(whiteout) => Point::new(whiteout.rect.x, whiteout.rect.y),
            AnnotationKind::Text(text) => Point::new(text.x, text.y),
            AnnotationKind::Signature(signature) => Point::new(signature.rect.x, signature.rect.y),
            AnnotationKind::Watermark(watermark) => watermark.center,
            AnnotationKind::PageNumber(number) => Point::new(number.x, number.y),
        }
    }

    pub fn set_anchor(&mut self, anchor: Point) {
        match &mut self.kind {
            AnnotationKind::Whiteout(whiteout) => {
                whiteout.rect.x = anchor.x;
                whiteout.rect.y = anchor.y;
            }
            AnnotationKind::Text(text) => {
                text.x = anchor.x;
                text.y = anchor.y;
            }
            AnnotationKind::Signature(signature) => {
                signature.rect.x = anchor.x;
                signature.rect.y = anchor.y;
            }
            AnnotationKind::Watermark(watermark) => watermark.center = anchor,
            AnnotationKind::PageNumber(number) => {
                number.x = anchor.x;
                number.y = anchor.y;
            }
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        let anchor = self.anchor();
        self.set_anchor(Point::new(anchor.x + dx, anchor.y + dy));
    }

    /// Turns the annotation's placement a quarter turn clockwise within a
    /// `frame_width x frame_height` page, following the page content.
    ///
    /// Whiteouts rotate with the content they cover; every other kind keeps
    /// its upright orientation and only its center moves.
    pub fn rotate_quarter_clockwise(
        &mut self,
        frame_width: f32,
        frame_height: f32,
        metrics: &dyn FontMetrics,
    ) {
        let turn = |p: Point| Point::new(frame_height - p.y, p.x);

        if let AnnotationKind::Whiteout(whiteout) = &mut self.kind {
            let rect = whiteout.rect;
            whiteout.rect = Rect::from_corners(
                turn(Point::new(rect.x, rect.y)),
                turn(Point::new(rect.right(), rect.bottom())),
            );
            return;
        }

        let bounds = self.bounds(metrics);
        let center = turn(bounds.center());
        let shift_x = center.x - bounds.center().x;
        let shift_y = center.y - bounds.center().y;
        self.translate(shift_x, shift_y);
    }
}

/// Bounding box of a (possibly multi-line) text annotation.
///
/// The box starts one font size above the first baseline and spans
/// `LINE_HEIGHT` per line; its width is the widest line.
pub fn measure_text_bounds(text: &TextAnnotation, metrics: &dyn FontMetrics) -> Rect {
    let spec = text.font_spec();
    let width = text.lines().map(|line| metrics.line_width(line, &spec)).fold(0.0_f32, f32::max);
    let height = text.font_size * text.line_count() as f32 * LINE_HEIGHT;
    Rect::new(text.x, text.y - text.font_size, width, height)
}

/// Position of an annotation within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub page_index: usize,
    pub annotation_index: usize,
}

impl Selection {
    pub fn new(page_index: usize, annotation_index: usize) -> Self {
        Self { page_index, annotation_index }
    }
}

/// Annotation lists keyed by page position.
///
/// Keys are always exactly `0..page_count`; structural edits go through the
/// reindex operations below, which rebuild the map and swap it in whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMap {
    pages: Vec<Vec<Annotation>>,
}

impl AnnotationMap {
    pub fn with_pages(page_count: usize) -> Self {
        Self { pages: (0..page_count).map(|_| Vec::new()).collect() }
    }

    pub fn from_lists(pages: Vec<Vec<Annotation>>) -> Self {
        Self { pages }
    }

    pub fn into_lists(self) -> Vec<Vec<Annotation>> {
        self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Annotations on a page; empty for an unknown key.
    pub fn page(&self, page_index: usize) -> &[Annotation] {
        self.pages.get(page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn page_mut(&mut self, page_index: usize) -> Option<&mut Vec<Annotation>> {
        self.pages.get_mut(page_index)
    }

    pub fn get(&self, selection: Selection) -> Option<&Annotation> {
        self.pages.get(selection.page_index)?.get(selection.annotation_index)
    }

    pub fn get_mut(&mut self, selection: Selection) -> Option<&mut Annotation> {
        self.pages.get_mut(selection.page_index)?.get_mut(selection.annotation_index)
    }

    pub fn find(&self, id: AnnotationId) -> Option<Selection> {
        self.pages.iter().enumerate().find_map(|(page_index, list)| {
            list.iter()
                .position(|annotation| annotation.id == id)
                .map(|annotation_index| Selection::new(page_index, annotation_index))
        })
    }

    /// Appends to a page's list and returns the new annotation's selection.
    pub fn push(&mut self, page_index: usize, annotation: Annotation) -> Option<Selection> {
        let list = self.pages.get_mut(page_index)?;
        list.push(annotation);
        Some(Selection::new(page_index, list.len() - 1))
    }

    pub fn remove(&mut self, selection: Selection) -> Option<Annotation> {
        let list = self.pages.get_mut(selection.page_index)?;
        (selection.annotation_index < list.len()).then(|| list.remove(selection.annotation_index))
    }

    pub fn replace_page(&mut self, page_index: usize, annotations: Vec<Annotation>) {
        if let Some(list) = self.pages.get_mut(page_index) {
            *list = annotations;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Annotation])> {
        self.pages.iter().enumerate().map(|(index, list)| (index, list.as_slice()))
    }

    /// Reorders keys to follow a page moving from `from` to `to`.
    pub fn move_page(&mut self, from: usize, to: usize) {
        let order = move_order(self.pages.len(), from, to);
        self.apply_order(&order);
    }

    /// Drops the list at `page_index` and shifts later keys down by one.
    pub fn delete_page(&mut self, page_index: usize) -> Vec<Annotation> {
        if page_index >= self.pages.len() {
            return Vec::new();
        }
        self.pages.remove(page_index)
    }

    /// Opens `count` empty keys at `at`, shifting later keys up.
    pub fn insert_pages(&mut self, at: usize, count: usize) {
        let at = at.min(self.pages.len());
        let mut next = Vec::with_capacity(self.pages.len() + count);
        let mut old = std::mem::take(&mut self.pages).into_iter();
        next.extend(old.by_ref().take(at));
        next.extend((0..count).map(|_| Vec::new()));
        next.extend(old);
        self.pages = next;
    }

    /// Rebuilds the map so that new key `i` holds old key `order[i]`.
    pub fn apply_order(&mut self, order: &[usize]) {
        let mut old: Vec<Option<Vec<Annotation>>> =
            std::mem::take(&mut self.pages).into_iter().map(Some).collect();
        self.pages = order
            .iter()
            .map(|&index| old.get_mut(index).and_then(Option::take).unwrap_or_default())
            .collect();
    }
}

/// New-position to old-position mapping for moving one element.
pub fn move_order(len: usize, from: usize, to: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if from < len && to < len && from != to {
        let moved = order.remove(from);
        order.insert(to, moved);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardFontMetrics;

    fn tagged_whiteout(tag: f32) -> Annotation {
        Annotation::whiteout(Rect::new(tag, tag, 10.0, 10.0))
    }

    fn tags(map: &AnnotationMap) -> Vec<Vec<f32>> {
        map.iter().map(|(_, list)| list.iter().map(|a| a.anchor().x).collect()).collect()
    }

    fn three_page_map() -> AnnotationMap {
        let mut map = AnnotationMap::with_pages(3);
        map.push(0, tagged_whiteout(0.0));
        map.push(1, tagged_whiteout(1.0));
        map.push(1, tagged_whiteout(11.0));
        map.push(2, tagged_whiteout(2.0));
        map
    }

    #[test]
    fn move_forward_reindexes_lists() {
        let mut map = three_page_map();
        map.move_page(0, 2);

        assert_eq!(tags(&map), vec![vec![1.0, 11.0], vec![2.0], vec![0.0]]);
    }

    #[test]
    fn move_backward_reindexes_lists() {
        let mut map = three_page_map();
        map.move_page(2, 0);

        assert_eq!(tags(&map), vec![vec![2.0], vec![0.0], vec![1.0, 11.0]]);
    }

    #[test]
    fn delete_shifts_later_keys_down() {
        let mut map = three_page_map();
        let removed = map.delete_page(1);

        assert_eq!(removed.len(), 2);
        assert_eq!(tags(&map), vec![vec![0.0], vec![2.0]]);
    }

    #[test]
    fn insert_shifts_later_keys_up() {
        let mut map = three_page_map();
        map.insert_pages(1, 2);

        assert_eq!(map.page_count(), 5);
        assert_eq!(tags(&map), vec![vec![0.0], vec![], vec![], vec![1.0, 11.0], vec![2.0]]);
    }

    #[test]
    fn find_locates_by_id() {
        let map = three_page_map();
        let id = map.page(1)[1].id;

        assert_eq!(map.find(id), Some(Selection::new(1, 1)));
        assert_eq!(map.total(), 4);
        assert!(map.page(9).is_empty());
    }

    #[test]
    fn text_bounds_follow_lines() {
        let text = TextAnnotation {
            x: 10.0,
            y: 50.0,
            text: "Hello\nHi".to_owned(),
            font_size: 10.0,
            font_family: "Helvetica".to_owned(),
            bold: false,
            italic: false,
            color: Color::BLACK,
        };

        let bounds = measure_text_bounds(&text, &StandardFontMetrics);
        assert_eq!(bounds.x, 10.0);
        assert_eq!(bounds.y, 40.0);
        assert!((bounds.width - 22.78).abs() < 1e-3);
        assert!((bounds.height - 24.0).abs() < 1e-4);
    }

    #[test]
    fn colors_round_trip_through_hex() {
        assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("#16a34a"), Some(Color::rgb(0x16, 0xa3, 0x4a)));
        assert_eq!(Color::parse_hex("#00000080").map(|c| c.a), Some(0x80));
        assert_eq!(Color::parse_hex("red"), None);
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");

        let json = serde_json::to_string(&Color::RED).expect("color should serialize");
        assert_eq!(json, "\"#ff0000\"");
    }

    #[test]
    fn quarter_turn_rotates_whiteout_with_content() {
        let mut annotation = Annotation::whiteout(Rect::new(10.0, 20.0, 30.0, 5.0));
        annotation.rotate_quarter_clockwise(200.0, 100.0, &StandardFontMetrics);

        let AnnotationKind::Whiteout(whiteout) = &annotation.kind else {
            panic!("kind should not change");
        };
        // (10,20)-(40,25) in a 200x100 frame lands at (75,10)-(80,40).
        assert_eq!(whiteout.rect, Rect::new(75.0, 10.0, 5.0, 30.0));
    }

    #[test]
    fn only_signatures_lock() {
        assert!(!tagged_whiteout(0.0).is_locked());
        let signature = Annotation::signature(SignatureAnnotation {
            rect: Rect::new(0.0, 0.0, 100.0, 50.0),
            image: crate::images::tests::dummy_image_id(),
            locked: true,
            role: SignatureRole::Paraf,
        });
        assert!(signature.is_locked());
        assert_eq!(signature.kind_name(), "paraf");
    }
}
