//! Rectangle types.
//!
//! These are used for detection windows, detection results and integral image queries.

use std::{cmp, fmt};

/// An axis-aligned rectangle.
///
/// This rectangle type uses (signed) integer coordinates measured in pixels. The top-left corner
/// is inclusive, the bottom-right corner lies at `x + width, y + height` and is exclusive.
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: i32, top_left_y: i32, width: u32, height: u32) -> Self {
        Self {
            x: top_left_x,
            y: top_left_y,
            width,
            height,
        }
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the (exclusive) X coordinate of the right side of the rectangle.
    #[inline]
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Returns the (exclusive) Y coordinate of the bottom side of the rectangle.
    #[inline]
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Returns the number of pixels contained in `self`.
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns the center point, rounded towards the top-left corner.
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns `None` when the intersection is empty (ie. the rectangles do not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = cmp::max(self.x, other.x);
        let y_min = cmp::max(self.y, other.y);
        let x_max = cmp::min(self.right(), other.right());
        let y_max = cmp::min(self.bottom(), other.bottom());
        if i64::from(x_min) >= x_max || i64::from(y_min) >= y_max {
            return None;
        }

        Some(Rect::from_top_left(
            x_min,
            y_min,
            (x_max - i64::from(x_min)) as u32,
            (y_max - i64::from(y_min)) as u32,
        ))
    }

    /// Returns whether `self` and `other` share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    fn intersection_area(&self, other: &Rect) -> u64 {
        self.intersection(other).map_or(0, |rect| rect.area())
    }

    fn union_area(&self, other: &Rect) -> u64 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Two empty rectangles have an IOU of 0.
    pub fn iou(&self, other: &Rect) -> f32 {
        let union = self.union_area(other);
        if union == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f32 / union as f32
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        let (bx, by) = (self.right(), self.bottom());
        write!(f, "Rect @ ({x},{y})-({bx},{by})/{w}x{h}")
    }
}
