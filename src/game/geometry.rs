//! Screen geometry
//!
//! Pixel points, capture regions and the pixel-to-centimetre scale used to
//! turn on-screen separation into physical jump distance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::InvalidInput;

/// A pixel coordinate in the screen frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Straight-line separation in pixels
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        dx.hypot(dy)
    }

    /// Manhattan (L1) separation in pixels
    pub fn manhattan_to(&self, other: Point) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Translate by an offset, saturating at the coordinate limits
    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned screen rectangle; `right` and `bottom` are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    /// Create a region, rejecting empty or inverted rectangles and spans
    /// wider than `i32::MAX` pixels
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self, InvalidInput> {
        let region = Self {
            left,
            top,
            right,
            bottom,
        };
        if right <= left || bottom <= top {
            return Err(InvalidInput::EmptyRegion(region.to_string()));
        }
        let spans = [
            ("region width", region.span_x()),
            ("region height", region.span_y()),
        ];
        for (name, span) in spans {
            if span > i64::from(i32::MAX) {
                return Err(InvalidInput::OutOfRange {
                    name,
                    expected: "at most 2147483647 px",
                    value: span.to_string(),
                });
            }
        }
        Ok(region)
    }

    /// Region covering a whole screen of the given resolution
    pub fn full_screen(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: i32::try_from(width).unwrap_or(i32::MAX),
            bottom: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    /// Build a region from two opposite corners given in any order
    pub fn from_corners(a: Point, b: Point) -> Result<Self, InvalidInput> {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    fn span_x(&self) -> i64 {
        i64::from(self.right) - i64::from(self.left)
    }

    fn span_y(&self) -> i64 {
        i64::from(self.bottom) - i64::from(self.top)
    }

    pub fn width(&self) -> u32 {
        u32::try_from(self.span_x().max(0)).unwrap_or(u32::MAX)
    }

    pub fn height(&self) -> u32 {
        u32::try_from(self.span_y().max(0)).unwrap_or(u32::MAX)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Check whether a screen point falls inside the region
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    /// Convert a screen point into region-local coordinates
    pub fn to_local(&self, point: Point) -> Point {
        Point::new(
            point.x.saturating_sub(self.left),
            point.y.saturating_sub(self.top),
        )
    }

    /// Convert a region-local point back into screen coordinates
    pub fn to_screen(&self, point: Point) -> Point {
        point.offset(self.left, self.top)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] -> [{}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Physical size of a screen pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    cm_per_px: f64,
}

impl PixelScale {
    /// Use a single known centimetre-per-pixel ratio
    pub fn uniform(cm_per_px: f64) -> Self {
        Self { cm_per_px }
    }

    /// Derive the ratio from physical screen size and resolution.
    ///
    /// Pixels are rarely perfectly square, so the horizontal and vertical
    /// ratios are averaged.
    pub fn from_screen(width_cm: f64, height_cm: f64, width_px: u32, height_px: u32) -> Self {
        let x = width_cm / f64::from(width_px.max(1));
        let y = height_cm / f64::from(height_px.max(1));
        Self::uniform((x + y) / 2.0)
    }

    pub fn cm_per_px(&self) -> f64 {
        self.cm_per_px
    }

    pub fn px_to_cm(&self, pixels: f64) -> f64 {
        pixels * self.cm_per_px
    }

    pub fn cm_to_px(&self, cm: f64) -> f64 {
        if self.cm_per_px == 0.0 {
            return 0.0;
        }
        cm / self.cm_per_px
    }

    /// Physical separation between two screen points
    pub fn distance_cm(&self, a: Point, b: Point) -> f64 {
        self.px_to_cm(a.distance_to(b))
    }
}
