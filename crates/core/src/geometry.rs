//! Surface geometry
//!
//! All annotation coordinates live in the raster space of the page surface:
//! origin at the top-left, x to the right, y downward, in surface pixels.

use serde::{Deserialize, Serialize};

/// A point in surface pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle, `(x, y)` being the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two arbitrary corners, normalized to a
    /// non-negative size.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        (self.x..=self.right()).contains(&point.x) && (self.y..=self.bottom()).contains(&point.y)
    }

    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => Point::new(self.x, self.y),
            Corner::TopRight => Point::new(self.right(), self.y),
            Corner::BottomLeft => Point::new(self.x, self.bottom()),
            Corner::BottomRight => Point::new(self.right(), self.bottom()),
        }
    }

    /// Places a `width x height` box so that the corner opposite `dragged`
    /// stays where it is in `self`.
    pub fn anchored_resize(&self, dragged: Corner, width: f32, height: f32) -> Rect {
        let x = match dragged {
            Corner::TopLeft | Corner::BottomLeft => self.right() - width,
            Corner::TopRight | Corner::BottomRight => self.x,
        };
        let y = match dragged {
            Corner::TopLeft | Corner::TopRight => self.bottom() - height,
            Corner::BottomLeft | Corner::BottomRight => self.y,
        };
        Rect::new(x, y, width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] =
        [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight];

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Whether dragging this corner to the right grows the box.
    pub fn grows_rightward(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// A pointer sample in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: u32,
    pub kind: PointerKind,
    pub client_x: f32,
    pub client_y: f32,
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn mouse(client_x: f32, client_y: f32, timestamp_ms: u64) -> Self {
        Self { pointer_id: 0, kind: PointerKind::Mouse, client_x, client_y, timestamp_ms }
    }

    pub fn touch(pointer_id: u32, client_x: f32, client_y: f32, timestamp_ms: u64) -> Self {
        Self { pointer_id, kind: PointerKind::Touch, client_x, client_y, timestamp_ms }
    }

    pub fn client_point(&self) -> Point {
        Point::new(self.client_x, self.client_y)
    }
}

/// Where a page surface is displayed, and how large its backing raster is.
///
/// The displayed box is in CSS pixels; the backing raster may be larger on
/// high-density screens, which is what makes the two scale factors differ
/// from one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLayout {
    pub left: f32,
    pub top: f32,
    pub display_width: f32,
    pub display_height: f32,
    pub raster_width: u32,
    pub raster_height: u32,
}

impl SurfaceLayout {
    /// Layout of a raster shown at its natural size at the viewport origin.
    pub fn identity(raster_width: u32, raster_height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            display_width: raster_width as f32,
            display_height: raster_height as f32,
            raster_width,
            raster_height,
        }
    }

    fn scale(&self) -> (f32, f32) {
        let sx = if self.display_width > 0.0 {
            self.raster_width as f32 / self.display_width
        } else {
            1.0
        };
        let sy = if self.display_height > 0.0 {
            self.raster_height as f32 / self.display_height
        } else {
            1.0
        };
        (sx, sy)
    }
}

/// Maps a pointer event into surface pixel coordinates.
pub fn to_surface_coords(event: &PointerEvent, layout: &SurfaceLayout) -> Point {
    let (sx, sy) = layout.scale();
    Point::new((event.client_x - layout.left) * sx, (event.client_y - layout.top) * sy)
}
