// src/ui/geometry.rs
//! Extent and box value types shared by the layout engine and the canvas.
//!
//! Layout works in unsigned extents ([`Size`]) and signed positions, so that a
//! child window computed from a saturating subtraction never wraps around.

use embedded_graphics::prelude::Point;
use embedded_graphics::primitives::Rectangle;

/// Immutable width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Component-wise minimum.
    pub fn min(self, other: Size) -> Size {
        Size::new(
            self.width.min(other.width),
            self.height.min(other.height),
        )
    }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Size {
        Size::new(
            self.width.max(other.width),
            self.height.max(other.height),
        )
    }

    pub fn saturating_add(self, other: Size) -> Size {
        Size::new(
            self.width.saturating_add(other.width),
            self.height.saturating_add(other.height),
        )
    }

    /// True when either side is zero, meaning nothing can be drawn into it.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<Size> for embedded_graphics::geometry::Size {
    fn from(size: Size) -> Self {
        embedded_graphics::geometry::Size::new(size.width, size.height)
    }
}

impl From<embedded_graphics::geometry::Size> for Size {
    fn from(size: embedded_graphics::geometry::Size) -> Self {
        Size::new(size.width, size.height)
    }
}

// ---------------------------------------------------------------------------
// BoundingBox
// ---------------------------------------------------------------------------

/// Inclusive pixel rectangle `(x0, y0)..=(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BoundingBox {
    /// Build a box from two corners in any order.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Box covering `size` pixels starting at `(x, y)`. Returns `None` for an empty size.
    pub fn from_origin_size(x: i32, y: i32, size: Size) -> Option<Self> {
        if size.is_empty() {
            return None;
        }
        Some(Self::new(
            x,
            y,
            x.saturating_add(size.width as i32 - 1),
            y.saturating_add(size.height as i32 - 1),
        ))
    }

    pub fn point(x: i32, y: i32) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn width(&self) -> u32 {
        (self.x1 - self.x0) as u32 + 1
    }

    pub fn height(&self) -> u32 {
        (self.y1 - self.y0) as u32 + 1
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.contains(other) {
            *self
        } else if other.contains(self) {
            *other
        } else {
            BoundingBox {
                x0: self.x0.min(other.x0),
                y0: self.y0.min(other.y0),
                x1: self.x1.max(other.x1),
                y1: self.y1.max(other.y1),
            }
        }
    }

    /// Grow the box in place to include the given pixel.
    pub fn expand_to(&mut self, x: i32, y: i32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }
}

impl From<BoundingBox> for Rectangle {
    fn from(bb: BoundingBox) -> Self {
        Rectangle::new(Point::new(bb.x0, bb.y0), bb.size().into())
    }
}
